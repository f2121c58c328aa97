//! OAuth sign-in, sign-out and token endpoints.

use crate::error::{ApiError, ApiResult};
use crate::session;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use core_auth::PublicToken;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub name: String,
}

/// 302 to `location`.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

pub async fn login(State(state): State<AppState>, jar: CookieJar) -> ApiResult<(CookieJar, Response)> {
    let (jar, session) = session::ensure(jar);
    let url = state.auth.begin_sign_in(session).await?;
    Ok((jar, found(&url)))
}

pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Response> {
    if let Some(error) = params.error {
        warn!(error = %error, "Authorization was declined");
        return Err(ApiError::Unauthorized(format!("Authorization failed: {}", error)));
    }

    let (code, oauth_state) = params
        .code
        .zip(params.state)
        .ok_or_else(|| ApiError::BadRequest("Missing code or state".to_string()))?;

    let session = session::require(&jar)?;
    state
        .auth
        .complete_sign_in(session, &code, &oauth_state)
        .await?;

    Ok(found("/"))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Response) {
    if let Some(session) = session::current(&jar) {
        state.auth.sign_out(session).await;
    }
    (session::clear(jar), found("/"))
}

pub async fn token(State(state): State<AppState>, jar: CookieJar) -> ApiResult<Json<PublicToken>> {
    let session = session::require(&jar)?;
    Ok(Json(state.auth.public_token(session).await?))
}

pub async fn profile(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<Json<ProfileResponse>> {
    let session = session::require(&jar)?;
    let tokens = state.auth.acquire(session).await?;
    let profile = state.provider.user_profile(&tokens.internal).await?;
    Ok(Json(ProfileResponse { name: profile.name }))
}
