//! Error types for the APS provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// APS provider errors
#[derive(Error, Debug)]
pub enum ApsError {
    /// The token was rejected (401/403)
    #[error("Authentication failed (status {status_code})")]
    AuthenticationFailed { status_code: u16 },

    /// API request returned an error
    #[error("APS API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Hub, project, folder or item does not exist or is not visible
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Pagination did not terminate
    #[error("Listing exceeded {0} pages")]
    TooManyPages(usize),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for APS operations
pub type Result<T> = std::result::Result<T, ApsError>;

impl ApsError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status_code: u16, resource: &str, body: &[u8]) -> Self {
        match status_code {
            401 | 403 => ApsError::AuthenticationFailed { status_code },
            404 => ApsError::NotFound {
                resource: resource.to_string(),
            },
            _ => ApsError::ApiError {
                status_code,
                message: String::from_utf8_lossy(body).chars().take(512).collect(),
            },
        }
    }
}

impl From<ApsError> for BridgeError {
    fn from(error: ApsError) -> Self {
        match error {
            ApsError::AuthenticationFailed { status_code } => {
                BridgeError::Unauthorized(format!("APS returned {}", status_code))
            }
            ApsError::NotFound { resource } => BridgeError::NotFound(resource),
            ApsError::ApiError {
                status_code,
                message,
            } => BridgeError::OperationFailed(format!(
                "API error (status {}): {}",
                status_code, message
            )),
            ApsError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            ApsError::TooManyPages(pages) => {
                BridgeError::OperationFailed(format!("Listing exceeded {} pages", pages))
            }
            ApsError::BridgeError(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ApsError::ApiError {
            status_code: 500,
            message: "boom".to_string(),
        };
        assert_eq!(error.to_string(), "APS API error (status 500): boom");
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            ApsError::from_status(403, "hub", b""),
            ApsError::AuthenticationFailed { status_code: 403 }
        ));
        assert!(matches!(
            ApsError::from_status(404, "hub", b""),
            ApsError::NotFound { .. }
        ));
        assert!(matches!(
            ApsError::from_status(502, "hub", b"bad gateway"),
            ApsError::ApiError { status_code: 502, .. }
        ));
    }

    #[test]
    fn test_error_conversion() {
        let bridge: BridgeError = ApsError::NotFound {
            resource: "projects/p1".into(),
        }
        .into();
        assert!(bridge.is_not_found());

        let bridge: BridgeError = ApsError::AuthenticationFailed { status_code: 401 }.into();
        assert!(bridge.is_unauthorized());
    }
}
