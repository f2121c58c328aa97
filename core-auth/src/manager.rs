//! # Token Lifecycle Manager
//!
//! Owns every session's credential state and is the only component that
//! mutates it.
//!
//! ## Overview
//!
//! A signed-in session holds two access tokens obtained together:
//! - an **internal** token with `data:read data:create`, used server-side to
//!   walk and download the document tree
//! - a **public** token with `viewables:read`, handed to the browser viewer
//!
//! Both are renewed from a single refresh token. Renewal is a two-step
//! exchange: the refresh token buys a new internal token plus a new refresh
//! token, which is immediately traded for the viewer token. The refresh
//! token returned by that second exchange is the one stored.
//!
//! Expiry is always stored as `now + expires_in` seconds, at sign-in and at
//! refresh alike.
//!
//! ## Concurrency
//!
//! Concurrent [`acquire`](TokenLifecycleManager::acquire) calls on one
//! session serialize on a per-session lock so only one refresh reaches the
//! token endpoint. Callers receive a by-value [`TokenPair`] snapshot.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{OAuthConfig, OAuthFlowManager, SessionId, SessionStore, TokenLifecycleManager};
//! use bridge_traits::time::SystemClock;
//! use std::sync::Arc;
//!
//! # async fn example(http_client: Arc<dyn bridge_traits::HttpClient>) -> core_auth::Result<()> {
//! let oauth = OAuthFlowManager::new(
//!     OAuthConfig::aps("id", "secret", "http://localhost:8080/api/auth/callback"),
//!     http_client,
//! );
//! let manager = TokenLifecycleManager::new(oauth, SessionStore::new(), Arc::new(SystemClock));
//!
//! let session = SessionId::new();
//! let login_url = manager.begin_sign_in(session).await?;
//! // ... user returns with ?code&state ...
//! # let (code, state) = ("code", "state");
//! manager.complete_sign_in(session, code, state).await?;
//! let tokens = manager.acquire(session).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::oauth::OAuthFlowManager;
use crate::session::SessionStore;
use crate::types::{
    CredentialState, OAuthTokens, PublicToken, SessionId, TokenPair, INTERNAL_SCOPES,
    PUBLIC_SCOPES,
};
use bridge_traits::time::Clock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, instrument, warn};

/// Default bound for a single token endpoint exchange
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(30);

/// Tokens this close to expiry are refreshed before use
pub const TOKEN_REFRESH_BUFFER: Duration = Duration::from_secs(30);

pub struct TokenLifecycleManager {
    oauth: OAuthFlowManager,
    sessions: SessionStore,
    clock: Arc<dyn Clock>,
    /// Token refresh locks to prevent concurrent refreshes
    refresh_locks: Arc<Mutex<HashMap<SessionId, Arc<Mutex<()>>>>>,
    auth_timeout: Duration,
    refresh_buffer: Duration,
}

impl TokenLifecycleManager {
    pub fn new(oauth: OAuthFlowManager, sessions: SessionStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            oauth,
            sessions,
            clock,
            refresh_locks: Arc::new(Mutex::new(HashMap::new())),
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            refresh_buffer: TOKEN_REFRESH_BUFFER,
        }
    }

    /// Override the bound applied to each token endpoint exchange.
    pub fn with_auth_timeout(mut self, auth_timeout: Duration) -> Self {
        self.auth_timeout = auth_timeout;
        self
    }

    /// Override how early before expiry tokens are renewed.
    pub fn with_refresh_buffer(mut self, refresh_buffer: Duration) -> Self {
        self.refresh_buffer = refresh_buffer;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Start a sign-in for `session` and return the URL to redirect to.
    ///
    /// Any earlier unfinished sign-in of the same session is superseded.
    #[instrument(skip(self), fields(session = %session))]
    pub async fn begin_sign_in(&self, session: SessionId) -> Result<String> {
        let (url, verifier) = self.oauth.build_auth_url()?;
        self.prune_sessions().await;
        self.sessions
            .begin_sign_in(session, verifier, self.clock.now())
            .await;
        info!("Sign-in started");
        Ok(url)
    }

    /// Finish a sign-in with the callback's `code` and `state`.
    ///
    /// Issues the internal token from the code, then immediately derives the
    /// viewer token from its refresh token.
    ///
    /// # Errors
    ///
    /// - `NoPendingSignIn` if [`begin_sign_in`](Self::begin_sign_in) was not called
    /// - `StateMismatch` if `state` does not match
    /// - `InvalidAuthCode` or `TokenRefreshFailed` if an exchange is rejected
    #[instrument(skip(self, code, state), fields(session = %session))]
    pub async fn complete_sign_in(&self, session: SessionId, code: &str, state: &str) -> Result<()> {
        let verifier = self
            .sessions
            .take_pending_sign_in(session, self.clock.now())
            .await
            .ok_or(AuthError::NoPendingSignIn)?;

        let internal = self
            .bounded("authorization code exchange", self.oauth.exchange_code(code, state, &verifier))
            .await?;

        let refresh_token = internal.refresh_token.clone().ok_or_else(|| {
            AuthError::InvalidAuthCode("token endpoint issued no refresh token".to_string())
        })?;

        let public = self
            .bounded(
                "viewer token exchange",
                self.oauth.refresh_access_token(&refresh_token, PUBLIC_SCOPES),
            )
            .await?;

        let credentials = CredentialState::from_grants(self.clock.now(), internal, public);
        debug!(expires_at = %credentials.expires_at, "Credentials issued");
        self.sessions.set_credentials(session, credentials).await;

        info!("Sign-in completed");
        Ok(())
    }

    /// Return valid tokens for `session`, refreshing them first if needed.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated` if the session has no credentials or no refresh token
    /// - `TokenRefreshFailed` if renewal failed; the session's credentials
    ///   are cleared and the user must sign in again
    #[instrument(skip(self), fields(session = %session))]
    pub async fn acquire(&self, session: SessionId) -> Result<TokenPair> {
        let current = self.current_credentials(session).await?;
        if !self.needs_refresh(&current) {
            return Ok(current.snapshot());
        }

        let refresh_lock = {
            let mut locks = self.refresh_locks.lock().await;
            locks
                .entry(session)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = refresh_lock.lock().await;

        // Another request may have refreshed while we waited.
        let current = self.current_credentials(session).await?;
        if !self.needs_refresh(&current) {
            debug!("Credentials refreshed by a concurrent request");
            return Ok(current.snapshot());
        }

        info!("Credentials expired or expiring soon, refreshing");
        match self.refresh(&current).await {
            Ok(renewed) => {
                let pair = renewed.snapshot();
                self.sessions.set_credentials(session, renewed).await;
                info!(expires_at = %pair.expires_at, "Credentials refreshed");
                Ok(pair)
            }
            Err(e) => {
                error!(error = %e, "Credential refresh failed, clearing session credentials");
                self.sessions.clear_credentials(session).await;
                self.refresh_locks.lock().await.remove(&session);
                Err(AuthError::TokenRefreshFailed(e.to_string()))
            }
        }
    }

    /// The viewer token and its remaining lifetime.
    pub async fn public_token(&self, session: SessionId) -> Result<PublicToken> {
        let pair = self.acquire(session).await?;
        Ok(PublicToken {
            expires_in: pair.expires_in(self.clock.now()),
            access_token: pair.public,
        })
    }

    /// Forget the session's credentials and any pending sign-in.
    #[instrument(skip(self), fields(session = %session))]
    pub async fn sign_out(&self, session: SessionId) {
        self.sessions.remove(session).await;
        self.refresh_locks.lock().await.remove(&session);
        info!("Signed out");
    }

    /// Evict abandoned sign-ins and idle sessions along with their refresh
    /// locks. Returns how many sessions were dropped.
    pub async fn prune_sessions(&self) -> usize {
        let removed = self.sessions.prune(self.clock.now()).await;
        if !removed.is_empty() {
            let mut locks = self.refresh_locks.lock().await;
            for session in &removed {
                locks.remove(session);
            }
            debug!(removed = removed.len(), "Pruned stale sessions");
        }
        removed.len()
    }

    async fn current_credentials(&self, session: SessionId) -> Result<CredentialState> {
        let credentials = self
            .sessions
            .credentials(session)
            .await
            .ok_or_else(|| AuthError::NotAuthenticated("no credentials for session".to_string()))?;

        if credentials.refresh_token.is_none() {
            warn!("Session holds no refresh token");
            return Err(AuthError::NotAuthenticated(
                "session holds no refresh token".to_string(),
            ));
        }
        Ok(credentials)
    }

    fn needs_refresh(&self, credentials: &CredentialState) -> bool {
        let buffer = chrono::Duration::from_std(self.refresh_buffer)
            .unwrap_or_else(|_| chrono::Duration::zero());
        credentials.is_expired_with_buffer(self.clock.now(), buffer)
    }

    async fn refresh(&self, current: &CredentialState) -> Result<CredentialState> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::NotAuthenticated("session holds no refresh token".to_string()))?;

        let internal = self
            .bounded(
                "internal token refresh",
                self.oauth.refresh_access_token(refresh_token, INTERNAL_SCOPES),
            )
            .await?;

        let next_refresh = internal
            .refresh_token
            .clone()
            .unwrap_or_else(|| refresh_token.to_string());

        let public = self
            .bounded(
                "viewer token refresh",
                self.oauth.refresh_access_token(&next_refresh, PUBLIC_SCOPES),
            )
            .await?;

        Ok(CredentialState::from_grants(self.clock.now(), internal, public))
    }

    async fn bounded<F>(&self, operation: &'static str, exchange: F) -> Result<OAuthTokens>
    where
        F: Future<Output = Result<OAuthTokens>>,
    {
        match timeout(self.auth_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                error!(operation, "Token endpoint exchange timed out");
                Err(AuthError::OperationTimeout {
                    operation,
                    elapsed: self.auth_timeout,
                })
            }
        }
    }
}
