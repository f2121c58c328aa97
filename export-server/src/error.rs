//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bridge_traits::error::BridgeError;
use core_auth::AuthError;
use core_export::ExportError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    /// The remote document service failed
    #[error("{0}")]
    BadGateway(String),

    /// The remote document service did not answer in time
    #[error("{0}")]
    GatewayTimeout(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            e if e.requires_sign_in() => ApiError::Unauthorized(e.to_string()),
            AuthError::InvalidAuthCode(msg) => ApiError::BadRequest(msg),
            e @ AuthError::NetworkError(_) => ApiError::BadGateway(e.to_string()),
            e @ AuthError::OperationTimeout { .. } => ApiError::GatewayTimeout(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(error: ExportError) -> Self {
        match error {
            ExportError::AuthExpired(msg) | ExportError::Denied(msg) => ApiError::Unauthorized(msg),
            ExportError::NotFound(msg) => ApiError::NotFound(msg),
            e @ ExportError::Transport(_) => ApiError::BadGateway(e.to_string()),
            e @ ExportError::TimedOut { .. } => ApiError::GatewayTimeout(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<BridgeError> for ApiError {
    fn from(error: BridgeError) -> Self {
        ExportError::from(error).into()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
