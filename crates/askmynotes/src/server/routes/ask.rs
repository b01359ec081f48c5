//! Question endpoint

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use super::parse_session_id;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{Answer, AskRequest};

/// POST /api/sessions/:id/ask - Answer a question from the indexed document
pub async fn ask_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<Answer>> {
    let session = state.sessions().get(&parse_session_id(&id)?)?;
    let Json(request) = request.map_err(|e| Error::InvalidRequest(e.body_text()))?;

    let mut orchestrator = session.orchestrator.lock().await;
    let answer = orchestrator.ask(&request).await?;
    Ok(Json(answer))
}
