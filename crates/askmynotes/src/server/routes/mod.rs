//! API routes for the note question-answering server

pub mod ask;
pub mod sessions;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::document::{DOCX_MIME, PDF_MIME, TEXT_MIME};

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/sessions", post(sessions::create_session))
        .route(
            "/sessions/:id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        // Upload - with larger body limit for the file
        .route(
            "/sessions/:id/document",
            post(sessions::upload_document).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/sessions/:id/ask", post(ask::ask_question))
        .route("/info", get(info))
}

/// Parse a session id from the path; unknown and malformed ids are both 404
pub(crate) fn parse_session_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| Error::SessionNotFound(raw.to_string()))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.config();
    Json(serde_json::json!({
        "name": "askmynotes",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Upload a note file and ask questions answered only from its content",
        "models": {
            "embedding": config.gemini.embedding_model,
            "generation": config.gemini.generation_model,
        },
        "chunking": {
            "chunk_size": config.chunking.chunk_size,
            "chunk_overlap": config.chunking.chunk_overlap,
        },
        "retrieval": {
            "top_k": config.retrieval.top_k,
            "metric": config.retrieval.metric,
        },
        "sessions": {
            "live": state.sessions().len(),
            "max": config.server.max_sessions,
            "idle_secs": config.server.session_idle_secs,
        },
        "formats": [PDF_MIME, DOCX_MIME, TEXT_MIME],
        "endpoints": {
            "POST /api/sessions": "Open a session",
            "GET /api/sessions/:id": "Session status",
            "DELETE /api/sessions/:id": "Close a session",
            "POST /api/sessions/:id/document": "Upload the document (multipart field 'file')",
            "POST /api/sessions/:id/ask": "Ask a question about the document"
        }
    }))
}
