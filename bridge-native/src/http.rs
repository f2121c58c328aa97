//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use futures::TryStreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("tenant-backup/", env!("CARGO_PKG_VERSION"));

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - Bounded retry with exponential backoff for idempotent requests
/// - Streaming downloads
///
/// No client-wide timeout is configured: a whole-request timeout would cut
/// long downloads short. Callers bound individual requests through
/// [`HttpRequest::timeout`] or by racing reads against a deadline.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_connect_timeout(Duration::from_secs(10))
    }

    /// Create a new HTTP client with a custom connect timeout
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(10)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                BridgeError::NotAvailable(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    /// Build reqwest request from bridge request
    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = request.body {
            req = req.body(body);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    fn map_send_error(e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::OperationFailed("Request timed out".to_string())
        } else if e.is_connect() {
            BridgeError::OperationFailed(format!("Connection failed: {}", e))
        } else {
            BridgeError::OperationFailed(e.to_string())
        }
    }

    fn map_status(status: u16, url: &str) -> BridgeError {
        match status {
            401 | 403 => BridgeError::Unauthorized(format!("HTTP {} from {}", status, url)),
            404 => BridgeError::NotFound(url.to_string()),
            _ => BridgeError::OperationFailed(format!("HTTP {} error from {}", status, url)),
        }
    }

    /// Execute request with retry logic
    async fn execute_with_retry_internal(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let max_attempts = if request.method.is_idempotent() {
            policy.max_attempts.max(1)
        } else {
            1
        };
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < max_attempts {
            debug!(
                attempt = attempt + 1,
                max_attempts,
                url = %request.url,
                "Executing HTTP request"
            );

            match self.build_request(request.clone()).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();

                    if status >= 500 || status == 429 {
                        warn!(
                            status,
                            attempt = attempt + 1,
                            "HTTP request failed with retryable status"
                        );
                        last_error = Some(Self::map_status(status, &request.url));
                    } else {
                        let headers: HashMap<String, String> = response
                            .headers()
                            .iter()
                            .filter_map(|(k, v)| {
                                v.to_str().ok().map(|s| (k.to_string(), s.to_string()))
                            })
                            .collect();

                        let body = response.bytes().await.map_err(Self::map_send_error)?;

                        return Ok(HttpResponse {
                            status,
                            headers,
                            body,
                        });
                    }
                }
                Err(e) => {
                    warn!(error = %e, attempt = attempt + 1, "HTTP request failed");
                    last_error = Some(Self::map_send_error(e));
                }
            }

            attempt += 1;

            if attempt < max_attempts {
                let delay = policy.delay_for(attempt);
                debug!(delay_ms = delay.as_millis() as u64, "Retrying after delay");
                sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BridgeError::OperationFailed("All retry attempts exhausted".to_string())
        }))
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_retry(request, RetryPolicy::default()).await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        self.execute_with_retry_internal(request, policy).await
    }

    async fn download_stream(
        &self,
        request: HttpRequest,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        let url = request.url.clone();
        let response = self
            .build_request(request)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(Self::map_status(status, &url));
        }

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let reader = tokio_util::io::StreamReader::new(stream);

        Ok(Box::new(reader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_client_creation() {
        assert!(ReqwestHttpClient::new().is_ok());
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Get),
            reqwest::Method::GET
        );
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Post),
            reqwest::Method::POST
        );
    }

    #[test]
    fn test_status_mapping() {
        assert!(ReqwestHttpClient::map_status(401, "u").is_unauthorized());
        assert!(ReqwestHttpClient::map_status(403, "u").is_unauthorized());
        assert!(ReqwestHttpClient::map_status(404, "u").is_not_found());
        assert!(matches!(
            ReqwestHttpClient::map_status(502, "u"),
            BridgeError::OperationFailed(_)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_operation_failure() {
        let client = ReqwestHttpClient::with_connect_timeout(Duration::from_millis(200)).unwrap();
        let request = HttpRequest::get("http://127.0.0.1:9/unreachable");
        let err = client
            .execute_with_retry(request, RetryPolicy::no_retry())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::OperationFailed(_)));
    }
}
