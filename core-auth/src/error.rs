use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// No session, no credentials, or credentials that can no longer be
    /// refreshed. Callers must sign in again.
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("OAuth state mismatch")]
    StateMismatch,

    #[error("No sign-in in progress for this session")]
    NoPendingSignIn,

    #[error("Authorization code rejected: {0}")]
    InvalidAuthCode(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("{operation} timed out after {elapsed:?}")]
    OperationTimeout {
        operation: &'static str,
        elapsed: Duration,
    },

    #[error("{0}")]
    Other(String),
}

impl AuthError {
    /// True when the caller has to sign in again to make progress.
    pub fn requires_sign_in(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthenticated(_)
                | AuthError::TokenRefreshFailed(_)
                | AuthError::NoPendingSignIn
                | AuthError::StateMismatch
        )
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
