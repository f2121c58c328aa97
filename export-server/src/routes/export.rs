//! Streaming archive download.
//!
//! The archive is produced by a spawned task writing into one end of an
//! in-memory pipe while the response body reads from the other. The body
//! owns a drop guard over the export's cancellation token: when the client
//! disconnects the body is dropped and the export stops issuing remote calls.
//!
//! Planning runs with the token acquired for the request. The streaming task
//! asks the session for a fresh token before every remote call.

use crate::error::{ApiError, ApiResult};
use crate::session;
use crate::state::AppState;
use crate::tokens::SessionTokens;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use core_export::BackupScope;
use futures::StreamExt;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub workspace_id: Option<String>,
    pub project_id: Option<String>,
}

pub async fn export(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let scope = BackupScope::from_query(query.workspace_id, query.project_id).ok_or_else(|| {
        ApiError::BadRequest("workspace_id and project_id must be given together".to_string())
    })?;

    let session = session::require(&jar)?;
    let tokens = state.auth.acquire(session).await?;

    let cancel = CancellationToken::new();
    let plan = state
        .orchestrator
        .plan(&scope, &tokens.internal, &cancel)
        .await?;
    info!(session = %session, scope = ?scope, "Starting export");

    let (writer, reader) = tokio::io::duplex(state.export.stream_buffer_kb.max(1) * 1024);
    let orchestrator = state.orchestrator.clone();
    let session_tokens = SessionTokens::new(state.auth.clone(), session);
    let export_cancel = cancel.clone();
    tokio::spawn(
        async move {
            // Outcome is logged by the orchestrator.
            let _ = orchestrator
                .execute(plan, &session_tokens, writer, export_cancel)
                .await;
        }
        .instrument(info_span!("export", session = %session)),
    );

    let cancel_on_drop = cancel.drop_guard();
    let stream = ReaderStream::new(reader).map(move |chunk| {
        let _ = &cancel_on_drop;
        chunk
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", state.export.archive_file_name),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::Internal(e.to_string()))
}
