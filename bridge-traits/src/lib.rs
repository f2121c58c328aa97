//! # Host Bridge Traits
//!
//! Abstraction traits between the export core and the outside world.
//!
//! ## Overview
//!
//! The core never talks to the network or the system clock directly. Each
//! capability it needs is expressed as a trait here and implemented once for
//! production (see `bridge-native`) and once more, usually as a mock, in
//! tests.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP with retry and streaming downloads
//! - [`DocumentProvider`](storage::DocumentProvider) - Listing and downloading a remote document tree
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should map remote 401/403 to `Unauthorized` and 404 to `NotFound` so that
//! callers can tell refused credentials and missing resources apart from
//! transport failures.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single instance can be shared
//! across request tasks behind an `Arc`.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::{DocumentProvider, Node, NodeKind, Project, UserProfile, Version, Workspace};
pub use time::{Clock, LogLevel, SystemClock};
