//! # Authentication Module
//!
//! Session-scoped OAuth 2.0 credentials for the APS document service.
//!
//! ## Overview
//!
//! Every browser session owns at most one credential set made of two access
//! tokens of different privilege and a refresh token that renews both. This
//! crate issues them ([`TokenLifecycleManager::complete_sign_in`]), keeps them
//! fresh ([`TokenLifecycleManager::acquire`]) and forgets them
//! ([`TokenLifecycleManager::sign_out`]).
//!
//! ## Features
//!
//! - OAuth 2.0 authorization code flow with PKCE
//! - Two-tier token issuance from one refresh token
//! - Refresh before expiry, serialized per session
//! - Injectable clock for deterministic expiry tests

pub mod error;
pub mod manager;
pub mod oauth;
pub mod session;
pub mod types;

pub use error::{AuthError, Result};
pub use manager::TokenLifecycleManager;
pub use oauth::{OAuthConfig, OAuthFlowManager, PkceVerifier};
pub use session::SessionStore;
pub use types::{CredentialState, OAuthTokens, PublicToken, SessionId, TokenPair};
