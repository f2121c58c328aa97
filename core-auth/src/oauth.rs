//! OAuth 2.0 Authorization Flow with PKCE Support
//!
//! Implements RFC 6749 (OAuth 2.0) and RFC 7636 (PKCE) against the APS
//! three-legged authentication endpoints.
//!
//! # Overview
//!
//! The flow manager handles:
//! - Building authorization URLs with PKCE challenge and CSRF state
//! - Exchanging authorization codes for tokens
//! - Refreshing tokens for an explicit scope set, which is how one refresh
//!   token is turned into both the elevated and the viewer credential
//!
//! # Security
//!
//! - The client authenticates with HTTP Basic credentials
//! - Never logs tokens, codes or verifiers
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::{OAuthConfig, OAuthFlowManager};
//! use std::sync::Arc;
//!
//! # async fn example() -> core_auth::Result<()> {
//! # use bridge_traits::http::HttpClient;
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let config = OAuthConfig::aps("client-id", "client-secret", "http://localhost:8080/api/auth/callback");
//! let flow = OAuthFlowManager::new(config, http_client);
//! let (auth_url, verifier) = flow.build_auth_url()?;
//! // Redirect user to auth_url, keep verifier for the callback...
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::{OAuthTokens, INTERNAL_SCOPES, PUBLIC_SCOPES};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpRequest};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const APS_AUTHORIZE_URL: &str = "https://developer.api.autodesk.com/authentication/v2/authorize";
pub const APS_TOKEN_URL: &str = "https://developer.api.autodesk.com/authentication/v2/token";

/// Number of attempts for a refresh that fails with a server error.
const MAX_REFRESH_ATTEMPTS: u32 = 3;

/// OAuth 2.0 client configuration.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Redirect URI for OAuth callback
    pub redirect_uri: String,
    /// Scopes requested at authorization time
    pub scopes: Vec<String>,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
}

impl OAuthConfig {
    /// Configuration for the APS authentication service, requesting both the
    /// elevated and the viewer scopes up front.
    pub fn aps(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scopes: INTERNAL_SCOPES
                .iter()
                .chain(PUBLIC_SCOPES)
                .map(|s| s.to_string())
                .collect(),
            auth_url: APS_AUTHORIZE_URL.to_string(),
            token_url: APS_TOKEN_URL.to_string(),
        }
    }

    fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// PKCE (Proof Key for Code Exchange) verifier.
///
/// Kept server-side between the login redirect and the callback. Only the
/// challenge derived from it leaves the server.
#[derive(Clone)]
pub struct PkceVerifier {
    /// The code verifier (base64-url-encoded random string)
    verifier: String,
    /// The state parameter for CSRF protection
    state: String,
}

impl PkceVerifier {
    /// Create a new PKCE verifier with cryptographically secure random values.
    ///
    /// Generates:
    /// - A 32-byte random code verifier (base64-url-encoded)
    /// - A 16-byte random state parameter (base64-url-encoded)
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();

        let mut verifier_bytes = [0u8; 32];
        rng.fill(&mut verifier_bytes);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes);
        let state = URL_SAFE_NO_PAD.encode(state_bytes);

        Self { verifier, state }
    }

    /// Get the code verifier string.
    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// Get the state parameter.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Compute the code challenge from the verifier.
    ///
    /// Uses S256 method: BASE64URL(SHA256(code_verifier))
    pub fn challenge(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

impl Default for PkceVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PkceVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceVerifier")
            .field("verifier", &"[REDACTED]")
            .field("state", &self.state)
            .finish()
    }
}

/// OAuth 2.0 flow manager.
pub struct OAuthFlowManager {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
}

impl OAuthFlowManager {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the authorization URL with PKCE challenge.
    ///
    /// Returns both the URL and the PKCE verifier, which must be kept for
    /// [`exchange_code`](Self::exchange_code).
    ///
    /// # Errors
    ///
    /// Returns an error if the configured authorization URL cannot be parsed.
    #[instrument(skip(self), fields(client_id = %self.config.client_id))]
    pub fn build_auth_url(&self) -> Result<(String, PkceVerifier)> {
        let verifier = PkceVerifier::new();
        let challenge = verifier.challenge();

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::Other(format!("Invalid auth URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", verifier.state())
            .append_pair("code_challenge", &challenge)
            .append_pair("code_challenge_method", "S256");

        debug!("Built authorization URL");

        Ok((url.to_string(), verifier))
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// - `StateMismatch` when `state` does not match the verifier
    /// - `InvalidAuthCode` when the token endpoint rejects the code
    /// - `NetworkError` when the endpoint is unreachable
    #[instrument(skip(self, code, state, verifier))]
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &str,
        verifier: &PkceVerifier,
    ) -> Result<OAuthTokens> {
        if state != verifier.state() {
            warn!("OAuth state mismatch on callback");
            return Err(AuthError::StateMismatch);
        }

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", verifier.verifier()),
        ];

        debug!("Exchanging authorization code for tokens");

        let request = HttpRequest::post(self.config.token_url.clone())
            .header("Authorization", self.config.basic_auth_header())
            .form(&params)
            .map_err(|e| AuthError::Other(format!("Failed to encode token request: {}", e)))?;

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        if !response.is_success() {
            let status = response.status;
            let error_body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            warn!(status, error = %error_body, "Authorization code exchange failed");

            return Err(AuthError::InvalidAuthCode(format!(
                "Token endpoint returned {}: {}",
                status, error_body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .map_err(|e| AuthError::Other(format!("Failed to parse token response: {}", e)))?;

        info!(
            expires_in = token_response.expires_in,
            "Exchanged authorization code for tokens"
        );

        Ok(token_response.into_tokens(None))
    }

    /// Trade a refresh token for a new access token limited to `scopes`.
    ///
    /// Server errors are retried with backoff; client errors are final
    /// because the refresh token has been rejected.
    ///
    /// # Errors
    ///
    /// Returns `TokenRefreshFailed` if the endpoint rejects the token,
    /// stays unavailable, or cannot be reached.
    #[instrument(skip(self, refresh_token), fields(scope = %scopes.join(" ")))]
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
        scopes: &[&str],
    ) -> Result<OAuthTokens> {
        let scope = scopes.join(" ");
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("scope", scope.as_str()),
        ];

        debug!("Refreshing access token");

        let mut attempts = 0;

        loop {
            attempts += 1;

            let request = HttpRequest::post(self.config.token_url.clone())
                .header("Authorization", self.config.basic_auth_header())
                .form(&params)
                .map_err(|e| {
                    AuthError::Other(format!("Failed to encode token request: {}", e))
                })?;

            let response = self
                .http_client
                .execute(request)
                .await
                .map_err(|e| AuthError::TokenRefreshFailed(e.to_string()))?;

            if response.is_success() {
                let token_response: TokenResponse = response.json().map_err(|e| {
                    AuthError::Other(format!("Failed to parse token response: {}", e))
                })?;

                info!(
                    expires_in = token_response.expires_in,
                    "Refreshed access token"
                );

                return Ok(token_response.into_tokens(Some(refresh_token)));
            }

            let status = response.status;
            let error_body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            if response.is_client_error() {
                warn!(status, error = %error_body, "Token refresh rejected");
                return Err(AuthError::TokenRefreshFailed(format!(
                    "Token endpoint returned {}: {}",
                    status, error_body
                )));
            }

            if attempts >= MAX_REFRESH_ATTEMPTS {
                return Err(AuthError::TokenRefreshFailed(format!(
                    "Token refresh failed after {} attempts. Last error: {} - {}",
                    attempts, status, error_body
                )));
            }

            let delay = Duration::from_millis(100 * 2u64.pow(attempts - 1));
            warn!(
                status,
                attempts,
                delay_ms = delay.as_millis() as u64,
                "Token refresh failed, retrying"
            );
            sleep(delay).await;
        }
    }
}

/// Token response from the OAuth provider.
#[derive(Debug, Deserialize, Serialize)]
struct TokenResponse {
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
}

impl TokenResponse {
    /// Keep `previous_refresh` when the endpoint does not rotate it.
    fn into_tokens(self, previous_refresh: Option<&str>) -> OAuthTokens {
        OAuthTokens::new(
            self.access_token,
            self.refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
            self.expires_in,
        )
    }
}

fn default_expires_in() -> i64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait::async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
            async fn download_stream(
                &self,
                request: HttpRequest,
            ) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;
        }
    }

    fn config() -> OAuthConfig {
        OAuthConfig {
            auth_url: "https://provider.test/authorize".to_string(),
            token_url: "https://provider.test/token".to_string(),
            ..OAuthConfig::aps("test-client", "secret", "http://localhost:8080/api/auth/callback")
        }
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn body_of(request: &HttpRequest) -> String {
        String::from_utf8(request.body.clone().unwrap_or_default().to_vec()).unwrap()
    }

    #[test]
    fn test_pkce_verifier_generation() {
        let verifier = PkceVerifier::new();

        assert!(!verifier.verifier().is_empty());
        assert!(!verifier.state().is_empty());
        assert_eq!(verifier.challenge(), verifier.challenge());

        let verifier2 = PkceVerifier::new();
        assert_ne!(verifier.verifier(), verifier2.verifier());
        assert_ne!(verifier.state(), verifier2.state());
    }

    #[test]
    fn test_pkce_challenge_is_url_safe() {
        let verifier = PkceVerifier {
            verifier: "test_verifier".to_string(),
            state: "test_state".to_string(),
        };

        let challenge = verifier.challenge();
        assert!(!challenge.contains('+'));
        assert!(!challenge.contains('/'));
        assert!(!challenge.contains('='));
    }

    #[test]
    fn test_aps_config_requests_both_scope_tiers() {
        let config = OAuthConfig::aps("id", "secret", "http://localhost/cb");
        assert_eq!(config.scopes, vec!["data:read", "data:create", "viewables:read"]);
        assert_eq!(config.token_url, APS_TOKEN_URL);
        assert!(!format!("{:?}", config).contains("secret\""));
    }

    #[test]
    fn test_build_auth_url() {
        let manager = OAuthFlowManager::new(config(), Arc::new(MockHttpClient::new()));
        let (url, verifier) = manager.build_auth_url().unwrap();

        assert!(url.starts_with("https://provider.test/authorize?"));
        assert!(url.contains("client_id=test-client"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=data%3Aread+data%3Acreate+viewables%3Aread"));
        assert!(url.contains(&format!("state={}", verifier.state())));
        assert!(url.contains("code_challenge_method=S256"));
    }

    #[test]
    fn test_build_auth_url_invalid_url() {
        let config = OAuthConfig {
            auth_url: "not a valid url".to_string(),
            ..config()
        };
        let manager = OAuthFlowManager::new(config, Arc::new(MockHttpClient::new()));
        assert!(manager.build_auth_url().is_err());
    }

    #[tokio::test]
    async fn test_exchange_code_rejects_state_mismatch() {
        let mut http = MockHttpClient::new();
        http.expect_execute().never();
        let manager = OAuthFlowManager::new(config(), Arc::new(http));
        let verifier = PkceVerifier::new();

        let err = manager
            .exchange_code("code", "forged", &verifier)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::StateMismatch));
    }

    #[tokio::test]
    async fn test_exchange_code_posts_basic_auth_form() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| {
                let body = body_of(req);
                req.url == "https://provider.test/token"
                    && req.headers.get("Authorization").map(String::as_str)
                        == Some("Basic dGVzdC1jbGllbnQ6c2VjcmV0")
                    && body.contains("grant_type=authorization_code")
                    && body.contains("code=abc")
                    && body.contains("code_verifier=")
            })
            .times(1)
            .returning(|_| {
                Ok(json_response(
                    200,
                    r#"{"access_token":"at","refresh_token":"rt","expires_in":3599}"#,
                ))
            });

        let manager = OAuthFlowManager::new(config(), Arc::new(http));
        let verifier = PkceVerifier::new();
        let tokens = manager
            .exchange_code("abc", &verifier.state().to_string(), &verifier)
            .await
            .unwrap();

        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
        assert_eq!(tokens.expires_in, 3599);
    }

    #[tokio::test]
    async fn test_refresh_sends_requested_scope() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| {
                let body = body_of(req);
                body.contains("grant_type=refresh_token")
                    && body.contains("refresh_token=old")
                    && body.contains("scope=viewables%3Aread")
            })
            .times(1)
            .returning(|_| Ok(json_response(200, r#"{"access_token":"viewer"}"#)));

        let manager = OAuthFlowManager::new(config(), Arc::new(http));
        let tokens = manager
            .refresh_access_token("old", PUBLIC_SCOPES)
            .await
            .unwrap();

        assert_eq!(tokens.access_token, "viewer");
        // Not rotated by the endpoint, so the old one stays usable.
        assert_eq!(tokens.refresh_token.as_deref(), Some("old"));
        assert_eq!(tokens.expires_in, 3600);
    }

    #[tokio::test]
    async fn test_refresh_client_error_is_not_retried() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(400, r#"{"error":"invalid_grant"}"#)));

        let manager = OAuthFlowManager::new(config(), Arc::new(http));
        let err = manager
            .refresh_access_token("revoked", INTERNAL_SCOPES)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenRefreshFailed(_)));
        assert!(err.requires_sign_in());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_server_error_is_retried() {
        let mut http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();
        http.expect_execute()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json_response(503, "unavailable")));
        http.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json_response(200, r#"{"access_token":"fresh","refresh_token":"new"}"#)));

        let manager = OAuthFlowManager::new(config(), Arc::new(http));
        let tokens = manager
            .refresh_access_token("old", INTERNAL_SCOPES)
            .await
            .unwrap();
        assert_eq!(tokens.refresh_token.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_refresh_transport_failure() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::OperationFailed("connection reset".into())));

        let manager = OAuthFlowManager::new(config(), Arc::new(http));
        let err = manager
            .refresh_access_token("old", INTERNAL_SCOPES)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenRefreshFailed(_)));
    }

    #[test]
    fn test_token_response_deserialization_minimal() {
        let response: TokenResponse = serde_json::from_str(r#"{"access_token":"token"}"#).unwrap();
        assert_eq!(response.access_token, "token");
        assert_eq!(response.refresh_token, None);
        assert_eq!(response.expires_in, 3600);
    }
}
