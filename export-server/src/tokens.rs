//! Session-backed bearer tokens for a running export.

use async_trait::async_trait;
use core_auth::{SessionId, TokenLifecycleManager};
use core_export::{ExportError, TokenSource};
use std::sync::Arc;
use tracing::warn;

/// Reads the session's elevated token through the lifecycle manager, so an
/// expiring token is refreshed before the next remote call.
pub struct SessionTokens {
    auth: Arc<TokenLifecycleManager>,
    session: SessionId,
}

impl SessionTokens {
    pub fn new(auth: Arc<TokenLifecycleManager>, session: SessionId) -> Self {
        Self { auth, session }
    }
}

#[async_trait]
impl TokenSource for SessionTokens {
    async fn bearer(&self) -> core_export::Result<String> {
        match self.auth.acquire(self.session).await {
            Ok(pair) => Ok(pair.internal),
            Err(e) => {
                warn!(session = %self.session, error = %e, "No token for running export");
                Err(ExportError::AuthExpired(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
    use bridge_traits::time::Clock;
    use bytes::Bytes;
    use chrono::{DateTime, TimeZone, Utc};
    use core_auth::{CredentialState, OAuthConfig, OAuthFlowManager, SessionStore};
    use std::sync::Mutex;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, secs: i64) {
            *self.0.lock().unwrap() += chrono::Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    /// Token endpoint that renews both tiers, or rejects every refresh.
    struct RefreshEndpoint {
        accept: bool,
    }

    #[async_trait]
    impl HttpClient for RefreshEndpoint {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            if !self.accept {
                return Ok(HttpResponse {
                    status: 400,
                    headers: Default::default(),
                    body: Bytes::from_static(br#"{"error":"invalid_grant"}"#),
                });
            }
            let body = String::from_utf8(request.body.unwrap_or_default().to_vec()).unwrap();
            let kind = if body.contains("viewables%3Aread") {
                "public"
            } else {
                "internal"
            };
            let json = format!(
                r#"{{"access_token":"{kind}-renewed","refresh_token":"r2","expires_in":3600}}"#
            );
            Ok(HttpResponse {
                status: 200,
                headers: Default::default(),
                body: Bytes::from(json),
            })
        }

        async fn download_stream(
            &self,
            _request: HttpRequest,
        ) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
            Err(BridgeError::NotAvailable("not a content server".into()))
        }
    }

    async fn signed_in(accept: bool) -> (SessionTokens, Arc<ManualClock>) {
        let start = Utc.timestamp_opt(1_000_000, 0).unwrap();
        let clock = Arc::new(ManualClock(Mutex::new(start)));
        let oauth = OAuthFlowManager::new(
            OAuthConfig::aps("id", "secret", "http://localhost:8080/api/auth/callback"),
            Arc::new(RefreshEndpoint { accept }),
        );
        let auth = Arc::new(TokenLifecycleManager::new(
            oauth,
            SessionStore::new(),
            clock.clone(),
        ));

        let session = SessionId::new();
        auth.sessions()
            .set_credentials(
                session,
                CredentialState {
                    internal_token: "internal-first".into(),
                    public_token: "public-first".into(),
                    refresh_token: Some("r1".into()),
                    expires_at: start + chrono::Duration::seconds(3600),
                },
            )
            .await;

        (SessionTokens::new(auth, session), clock)
    }

    #[tokio::test]
    async fn test_bearer_is_renewed_after_expiry() {
        let (tokens, clock) = signed_in(true).await;
        assert_eq!(tokens.bearer().await.unwrap(), "internal-first");

        clock.advance(3600);
        assert_eq!(tokens.bearer().await.unwrap(), "internal-renewed");
        assert_eq!(tokens.bearer().await.unwrap(), "internal-renewed");
    }

    #[tokio::test]
    async fn test_rejected_refresh_ends_the_export() {
        let (tokens, clock) = signed_in(false).await;
        assert_eq!(tokens.bearer().await.unwrap(), "internal-first");

        clock.advance(3600);
        assert!(matches!(
            tokens.bearer().await,
            Err(ExportError::AuthExpired(_))
        ));
    }
}
