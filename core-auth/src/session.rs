//! In-memory session registry.
//!
//! Maps session ids to the credential state and any sign-in that is waiting
//! for its OAuth callback. Stale entries are evicted by [`SessionStore::prune`].

use crate::oauth::PkceVerifier;
use crate::types::{CredentialState, SessionId};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Seconds a sign-in may wait for its OAuth callback.
pub const PENDING_SIGN_IN_TTL_SECS: i64 = 10 * 60;

/// Seconds a session is kept after its tokens expired without being renewed.
pub const IDLE_SESSION_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
struct PendingSignIn {
    verifier: PkceVerifier,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone)]
struct SessionEntry {
    credentials: Option<CredentialState>,
    pending_sign_in: Option<PendingSignIn>,
}

impl SessionEntry {
    fn is_empty(&self) -> bool {
        self.credentials.is_none() && self.pending_sign_in.is_none()
    }

    /// Drop whatever has outlived its TTL at `now`.
    fn expire(&mut self, now: DateTime<Utc>, pending_ttl: Duration, idle_ttl: Duration) {
        if self
            .pending_sign_in
            .as_ref()
            .is_some_and(|pending| pending.started_at + pending_ttl <= now)
        {
            self.pending_sign_in = None;
        }
        if self
            .credentials
            .as_ref()
            .is_some_and(|credentials| credentials.expires_at + idle_ttl <= now)
        {
            self.credentials = None;
        }
    }
}

/// Shared, cloneable handle to all sessions.
///
/// Entries are created by a sign-in and live until sign-out, a failed
/// refresh, or [`prune`](Self::prune) finds them stale: a sign-in older than
/// [`PENDING_SIGN_IN_TTL_SECS`], or credentials expired for longer than
/// [`IDLE_SESSION_TTL_SECS`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<SessionId, SessionEntry>>>,
    pending_ttl: Duration,
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self {
            inner: Arc::default(),
            pending_ttl: Duration::seconds(PENDING_SIGN_IN_TTL_SECS),
            idle_ttl: Duration::seconds(IDLE_SESSION_TTL_SECS),
        }
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttls(mut self, pending_ttl: Duration, idle_ttl: Duration) -> Self {
        self.pending_ttl = pending_ttl;
        self.idle_ttl = idle_ttl;
        self
    }

    pub async fn credentials(&self, session: SessionId) -> Option<CredentialState> {
        self.inner
            .read()
            .await
            .get(&session)
            .and_then(|entry| entry.credentials.clone())
    }

    pub async fn set_credentials(&self, session: SessionId, credentials: CredentialState) {
        self.inner
            .write()
            .await
            .entry(session)
            .or_default()
            .credentials = Some(credentials);
    }

    /// Drop the credentials of `session`, and the session itself when no
    /// sign-in is pending.
    pub async fn clear_credentials(&self, session: SessionId) {
        let mut sessions = self.inner.write().await;
        if let Some(entry) = sessions.get_mut(&session) {
            entry.credentials = None;
            if entry.is_empty() {
                sessions.remove(&session);
            }
        }
    }

    /// Remember the verifier of a sign-in started for `session` at `now`,
    /// replacing any earlier one.
    pub async fn begin_sign_in(&self, session: SessionId, verifier: PkceVerifier, now: DateTime<Utc>) {
        self.inner
            .write()
            .await
            .entry(session)
            .or_default()
            .pending_sign_in = Some(PendingSignIn {
            verifier,
            started_at: now,
        });
    }

    /// Take the pending verifier. A verifier can be used once and not after
    /// its TTL.
    pub async fn take_pending_sign_in(
        &self,
        session: SessionId,
        now: DateTime<Utc>,
    ) -> Option<PkceVerifier> {
        let mut sessions = self.inner.write().await;
        let entry = sessions.get_mut(&session)?;
        let pending = entry.pending_sign_in.take();
        if entry.is_empty() {
            sessions.remove(&session);
        }

        pending
            .filter(|pending| pending.started_at + self.pending_ttl > now)
            .map(|pending| pending.verifier)
    }

    /// Forget everything about `session`.
    pub async fn remove(&self, session: SessionId) {
        self.inner.write().await.remove(&session);
    }

    /// Expire stale sign-ins and idle credentials, dropping sessions left
    /// with neither. Returns the removed sessions.
    pub async fn prune(&self, now: DateTime<Utc>) -> Vec<SessionId> {
        let mut sessions = self.inner.write().await;
        let mut removed = Vec::new();

        sessions.retain(|id, entry| {
            entry.expire(now, self.pending_ttl, self.idle_ttl);
            let keep = !entry.is_empty();
            if !keep {
                removed.push(*id);
            }
            keep
        });

        removed
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
