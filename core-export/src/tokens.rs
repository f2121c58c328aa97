//! Bearer tokens for the remote calls of one export.
//!
//! An export can outlive the access token it started with, so the walker
//! asks a [`TokenSource`] before every remote call instead of holding a
//! single string for the whole run.

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TokenSource: Send + Sync {
    /// The bearer to send with the next remote call.
    ///
    /// Fails with [`ExportError::AuthExpired`](crate::ExportError::AuthExpired)
    /// once no valid token can be produced, which ends the export.
    async fn bearer(&self) -> Result<String>;
}

/// A token that never changes. Used for planning and in tests.
#[derive(Debug, Clone)]
pub struct FixedToken(String);

impl FixedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for FixedToken {
    async fn bearer(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
