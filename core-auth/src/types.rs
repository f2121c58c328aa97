use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Elevated scope used for tree listing and content download.
pub const INTERNAL_SCOPES: &[&str] = &["data:read", "data:create"];

/// Restricted scope handed to the browser viewer.
pub const PUBLIC_SCOPES: &[&str] = &["viewables:read"];

/// Opaque identifier of a browser session.
///
/// Sessions are created on first login and carried in a cookie. The id is
/// the only thing the HTTP layer knows about a user's credentials.
///
/// # Examples
///
/// ```
/// use core_auth::SessionId;
///
/// let id = SessionId::new();
/// let parsed: SessionId = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// The instant a token issued at `now` with lifetime `expires_in` stops
/// being valid.
///
/// Login and refresh both go through this helper so the stored expiry is
/// always in the same unit.
pub fn expiry_from(now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    now + Duration::seconds(expires_in.max(0))
}

/// A single token endpoint grant.
///
/// # Security
///
/// The `Debug` implementation redacts both tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, as reported by the token endpoint.
    pub expires_in: i64,
}

impl OAuthTokens {
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
        }
    }
}

impl fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Session-scoped credential state.
///
/// Holds the elevated (internal) and viewer (public) access tokens issued
/// together, the refresh token that renews both, and one absolute expiry.
/// Only [`TokenLifecycleManager`](crate::TokenLifecycleManager) mutates it.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialState {
    pub internal_token: String,
    pub public_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl CredentialState {
    /// Combine an elevated grant and the viewer grant derived from it.
    ///
    /// The viewer grant was issued last, so its refresh token is the live
    /// one. Both tokens share the earlier of the two expiries.
    pub fn from_grants(now: DateTime<Utc>, internal: OAuthTokens, public: OAuthTokens) -> Self {
        let expires_in = internal.expires_in.min(public.expires_in);
        Self {
            internal_token: internal.access_token,
            public_token: public.access_token,
            refresh_token: public.refresh_token.or(internal.refresh_token),
            expires_at: expiry_from(now, expires_in),
        }
    }

    /// True when the tokens expire within `buffer` of `now`.
    pub fn is_expired_with_buffer(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        now >= self.expires_at - buffer
    }

    /// Snapshot handed to request handlers.
    pub fn snapshot(&self) -> TokenPair {
        TokenPair {
            internal: self.internal_token.clone(),
            public: self.public_token.clone(),
            expires_at: self.expires_at,
        }
    }
}

impl fmt::Debug for CredentialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialState")
            .field("internal_token", &"[REDACTED]")
            .field("public_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// By-value credential snapshot passed into one request's work.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub internal: String,
    pub public: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenPair {
    /// Whole seconds of validity left at `now`, never negative.
    pub fn expires_in(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("internal", &"[REDACTED]")
            .field("public", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Viewer token as returned to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicToken {
    pub access_token: String,
    pub expires_in: i64,
}
