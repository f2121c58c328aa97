use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Remote resource not found: {0}")]
    NotFound(String),

    #[error("Remote service rejected credentials: {0}")]
    Unauthorized(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// True when the failure says the credential was refused rather than the
    /// transport failing.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BridgeError::Unauthorized(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BridgeError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
