//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the backup server:
//! - Logging and tracing setup
//! - Configuration loading and validation
//!
//! Every other crate in the workspace logs through `tracing`; this crate
//! decides where those events go.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ClientCredentials, ExportSettings, ServerConfig, ServerConfigBuilder};
pub use error::{Error, Result};
