//! Tree browsing endpoints backing the hub/project/folder tree view.

use crate::error::ApiResult;
use crate::session;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use bridge_traits::storage::{Node, Project, Version, Workspace};
use core_auth::TokenPair;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ContentsQuery {
    pub folder_id: Option<String>,
}

async fn tokens(state: &AppState, jar: &CookieJar) -> ApiResult<TokenPair> {
    let session = session::require(jar)?;
    Ok(state.auth.acquire(session).await?)
}

pub async fn hubs(State(state): State<AppState>, jar: CookieJar) -> ApiResult<Json<Vec<Workspace>>> {
    let tokens = tokens(&state, &jar).await?;
    Ok(Json(state.provider.list_workspaces(&tokens.internal).await?))
}

pub async fn projects(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(hub_id): Path<String>,
) -> ApiResult<Json<Vec<Project>>> {
    let tokens = tokens(&state, &jar).await?;
    Ok(Json(
        state
            .provider
            .list_projects(&hub_id, &tokens.internal)
            .await?,
    ))
}

pub async fn contents(
    State(state): State<AppState>,
    jar: CookieJar,
    Path((hub_id, project_id)): Path<(String, String)>,
    Query(query): Query<ContentsQuery>,
) -> ApiResult<Json<Vec<Node>>> {
    let tokens = tokens(&state, &jar).await?;
    let nodes = state
        .provider
        .list_folder_contents(
            &hub_id,
            &project_id,
            query.folder_id.as_deref().filter(|id| !id.is_empty()),
            &tokens.internal,
        )
        .await?;
    Ok(Json(nodes))
}

pub async fn versions(
    State(state): State<AppState>,
    jar: CookieJar,
    Path((_hub_id, project_id, item_id)): Path<(String, String, String)>,
) -> ApiResult<Json<Vec<Version>>> {
    let tokens = tokens(&state, &jar).await?;
    Ok(Json(
        state
            .provider
            .list_item_versions(&project_id, &item_id, &tokens.internal)
            .await?,
    ))
}
