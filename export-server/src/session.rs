//! Browser session cookie.
//!
//! The cookie only carries an opaque [`SessionId`]; credentials stay in the
//! server-side `SessionStore`.

use crate::error::ApiError;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use core_auth::SessionId;

pub const SESSION_COOKIE: &str = "tb_session";

/// The session named by the request's cookie, if any.
pub fn current(jar: &CookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse().ok())
}

pub fn require(jar: &CookieJar) -> Result<SessionId, ApiError> {
    current(jar).ok_or_else(|| ApiError::Unauthorized("Not signed in".to_string()))
}

/// Reuse the request's session or start a new one.
pub fn ensure(jar: CookieJar) -> (CookieJar, SessionId) {
    match current(&jar) {
        Some(session) => (jar, session),
        None => {
            let session = SessionId::new();
            (jar.add(session_cookie(session)), session)
        }
    }
}

pub fn clear(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

fn session_cookie(session: SessionId) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}
