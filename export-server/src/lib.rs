//! # Export Server
//!
//! HTTP surface of the tenant backup service: OAuth sign-in, tree browsing
//! and the streaming `/api/export` download.

pub mod error;
pub mod routes;
pub mod session;
pub mod state;
pub mod tokens;

pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::AppState;
