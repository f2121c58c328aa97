//! Timeout-guarded remote calls.
//!
//! Every listing call, content open and content chunk read of an export goes
//! through a [`CallGuard`]. The guard races the operation against a fixed
//! bound and against the export's cancellation token; the loser is dropped.

use crate::error::{ExportError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct CallGuard {
    bound: Duration,
    cancel: CancellationToken,
}

impl CallGuard {
    pub fn new(bound: Duration, cancel: CancellationToken) -> Self {
        Self { bound, cancel }
    }

    pub fn bound(&self) -> Duration {
        self.bound
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run a bridge call under the bound.
    pub async fn call<T, F>(&self, operation: &'static str, future: F) -> Result<T>
    where
        F: Future<Output = bridge_traits::error::Result<T>>,
    {
        self.race(operation, future).await?.map_err(ExportError::from)
    }

    /// Read the next chunk of `reader` into `buf` under the bound.
    ///
    /// Returns `Ok(0)` at end of stream.
    pub async fn read_chunk<R>(&self, reader: &mut R, buf: &mut [u8]) -> Result<usize>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        self.race("read content chunk", reader.read(buf))
            .await?
            .map_err(|e| ExportError::Transport(e.to_string()))
    }

    async fn race<T, F>(&self, operation: &'static str, future: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        if self.cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ExportError::Cancelled),
            outcome = tokio::time::timeout(self.bound, future) => {
                outcome.map_err(|_| ExportError::TimedOut {
                    operation,
                    elapsed: self.bound,
                })
            }
        }
    }
}
