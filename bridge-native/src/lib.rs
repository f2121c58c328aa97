//! # Native Bridge Implementations
//!
//! Production implementations of the bridge traits for server deployments.
//!
//! - `HttpClient` using `reqwest` with rustls
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_native::ReqwestHttpClient;
//! use std::sync::Arc;
//!
//! let http: Arc<dyn bridge_traits::HttpClient> = Arc::new(ReqwestHttpClient::new()?);
//! ```

mod http;

pub use http::ReqwestHttpClient;
