//! Session lifecycle and document upload endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};

use super::parse_session_id;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{IngestSummary, SessionCreated, SessionStatus, Upload};

/// Multipart field carrying the file
const FILE_FIELD: &str = "file";

/// POST /api/sessions - Open a session
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionCreated>)> {
    let (session_id, session) = state.create_session()?;
    Ok((
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id,
            status: session.status.snapshot(),
        }),
    ))
}

/// GET /api/sessions/:id - Session status
///
/// Answers while an upload is in progress.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatus>> {
    let session = state.sessions().get(&parse_session_id(&id)?)?;
    Ok(Json(session.status.snapshot()))
}

/// DELETE /api/sessions/:id - Close a session
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.sessions().remove(&parse_session_id(&id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/:id/document - Upload and index the session's document
///
/// Replaces any previously indexed document.
pub async fn upload_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<IngestSummary>> {
    let session = state.sessions().get(&parse_session_id(&id)?)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidRequest(format!("Failed to read file {}: {}", filename, e)))?;

        upload = Some(Upload::new(filename, content_type, data));
        break;
    }

    let upload = upload.ok_or_else(|| {
        Error::InvalidRequest(format!("Missing multipart field '{}'", FILE_FIELD))
    })?;

    let mut orchestrator = session.orchestrator.lock().await;
    let summary = orchestrator.upload(upload).await?;
    Ok(Json(summary))
}
