//! HTTP routes.

pub mod auth;
pub mod browse;
pub mod export;

use crate::state::AppState;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/export", get(export::export))
        .route("/api/auth/login", get(auth::login))
        .route("/api/auth/callback", get(auth::callback))
        .route("/api/auth/logout", get(auth::logout))
        .route("/api/auth/token", get(auth::token))
        .route("/api/auth/profile", get(auth::profile))
        .route("/api/hubs", get(browse::hubs))
        .route("/api/hubs/:hub_id/projects", get(browse::projects))
        .route(
            "/api/hubs/:hub_id/projects/:project_id/contents",
            get(browse::contents),
        )
        .route(
            "/api/hubs/:hub_id/projects/:project_id/contents/:item_id/versions",
            get(browse::versions),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
