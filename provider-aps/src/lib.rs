//! # APS Provider
//!
//! Implements `DocumentProvider` for the Autodesk Platform Services project
//! and data management APIs.
//!
//! ## Overview
//!
//! This module provides:
//! - Hub, project, folder and version listings with `links.next` pagination
//! - Streaming downloads of version content from its storage location
//! - Signed-in user profile lookup
//! - Status classification into bridge errors (401/403, 404, other)

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{ApsConnector, APS_API_BASE, APS_USERINFO_URL};
pub use error::{ApsError, Result};
