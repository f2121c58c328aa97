//! # Core Export
//!
//! Streams a remote document tree into a ZIP archive.
//!
//! ## Overview
//!
//! This module provides:
//! - [`CallGuard`]: per-call timeout and cancellation for remote operations
//! - [`TreeWalker`]: depth-first walk of one project producing entries and skips
//! - [`ArchiveBuilder`]: incremental ZIP writer over an async sink
//! - [`BackupOrchestrator`]: tenant-wide and single-project export workflows
//! - [`sanitize`]: archive path component sanitization
//! - [`TokenSource`]: bearer tokens renewed over the course of an export

pub mod archive;
pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod sanitize;
pub mod tokens;
pub mod walker;

pub use archive::{AppendOutcome, ArchiveBuilder};
pub use error::{ExportError, Result};
pub use guard::CallGuard;
pub use orchestrator::{BackupOrchestrator, BackupPlan, BackupReport, BackupScope};
pub use tokens::{FixedToken, TokenSource};
pub use walker::{SkipReason, SkipRecord, TreeWalker, WalkEntry, WalkRoot, WalkStep};
