use bridge_traits::error::BridgeError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    /// No valid access token can be obtained for the session
    #[error("Credentials expired: {0}")]
    AuthExpired(String),

    /// The remote API refused access to one resource (401/403)
    #[error("Access denied: {0}")]
    Denied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{operation} timed out after {elapsed:?}")]
    TimedOut {
        operation: &'static str,
        elapsed: Duration,
    },

    /// Writing to the archive output failed
    #[error("Archive sink error: {0}")]
    Sink(String),

    /// The client went away
    #[error("Export cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ExportError>;

impl ExportError {
    /// Whether the failure can be confined to one node of the tree.
    ///
    /// A 404 while walking means the node vanished between listings and is
    /// treated like a transport failure. A 401/403 on one folder or item
    /// usually means per-folder permissions, not a dead session. During
    /// planning both are fatal.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ExportError::Transport(_)
                | ExportError::TimedOut { .. }
                | ExportError::NotFound(_)
                | ExportError::Denied(_)
        )
    }
}

impl From<BridgeError> for ExportError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Unauthorized(msg) => ExportError::Denied(msg),
            BridgeError::NotFound(msg) => ExportError::NotFound(msg),
            other => ExportError::Transport(other.to_string()),
        }
    }
}
