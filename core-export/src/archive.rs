//! # Archive Builder
//!
//! Incremental ZIP writer over an async sink.
//!
//! Entries are written with Deflate and data descriptors, so each local
//! header and its compressed bytes reach the sink as soon as they are
//! produced. The archive is never held in memory as a whole. Directory markers
//! are stored zero-byte entries whose name ends in `/`.
//!
//! A content stream that fails mid-entry does not poison the archive: the
//! entry is closed with whatever was read and the caller is told it was
//! truncated. Only a failure writing to the sink is fatal.

use crate::error::{ExportError, Result};
use crate::guard::CallGuard;
use async_zip::base::write::ZipFileWriter;
use async_zip::error::ZipError;
use async_zip::{Compression, ZipEntryBuilder};
use futures::io::AsyncWriteExt as _;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::compat::Compat;
use tracing::{debug, warn};

/// Size of each content read.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Result of appending one entry.
#[derive(Debug)]
pub enum AppendOutcome {
    Complete { bytes: u64 },
    /// The content stream failed after `bytes` were copied
    Truncated { bytes: u64, error: ExportError },
}

impl AppendOutcome {
    pub fn bytes(&self) -> u64 {
        match self {
            AppendOutcome::Complete { bytes } | AppendOutcome::Truncated { bytes, .. } => *bytes,
        }
    }
}

pub struct ArchiveBuilder<W>
where
    W: AsyncWrite + Unpin,
{
    writer: ZipFileWriter<Compat<W>>,
    entries: usize,
    directories: usize,
}

fn sink_error(error: ZipError) -> ExportError {
    ExportError::Sink(error.to_string())
}

impl<W> ArchiveBuilder<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(sink: W) -> Self {
        Self {
            writer: ZipFileWriter::with_tokio(sink),
            entries: 0,
            directories: 0,
        }
    }

    /// Entries appended so far, directory markers excluded.
    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn directories(&self) -> usize {
        self.directories
    }

    /// Write an empty directory marker for `path`.
    pub async fn add_directory(&mut self, path: &str) -> Result<()> {
        let name = format!("{}/", path.trim_end_matches('/'));
        debug!(path = %name, "Adding directory marker");

        let entry = ZipEntryBuilder::new(name.into(), Compression::Stored);
        self.writer
            .write_entry_whole(entry, &[])
            .await
            .map_err(sink_error)?;
        self.directories += 1;
        Ok(())
    }

    /// Stream `content` into a new entry at `path`, one guarded chunk at a
    /// time.
    pub async fn append<R>(
        &mut self,
        path: &str,
        content: &mut R,
        guard: &CallGuard,
    ) -> Result<AppendOutcome>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let entry = ZipEntryBuilder::new(path.to_string().into(), Compression::Deflate);
        let mut entry_writer = self
            .writer
            .write_entry_stream(entry)
            .await
            .map_err(sink_error)?;

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut bytes = 0u64;
        let mut failure = None;

        loop {
            match guard.read_chunk(content, &mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    entry_writer
                        .write_all(&buf[..n])
                        .await
                        .map_err(|e| ExportError::Sink(e.to_string()))?;
                    bytes += n as u64;
                }
                Err(error) if error.is_recoverable() => {
                    warn!(path = %path, bytes, error = %error, "Content stream failed, closing entry truncated");
                    failure = Some(error);
                    break;
                }
                Err(error) => return Err(error),
            }
        }

        entry_writer.close().await.map_err(sink_error)?;
        self.entries += 1;

        Ok(match failure {
            None => AppendOutcome::Complete { bytes },
            Some(error) => AppendOutcome::Truncated { bytes, error },
        })
    }

    /// Write the central directory and flush the sink.
    pub async fn finalize(self) -> Result<W> {
        let mut sink = self
            .writer
            .close()
            .await
            .map_err(sink_error)?
            .into_inner();
        sink.shutdown()
            .await
            .map_err(|e| ExportError::Sink(e.to_string()))?;
        Ok(sink)
    }
}
