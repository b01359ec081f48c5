//! Error types for the note question-answering pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Declared MIME type is not one of PDF, DOCX or plain text
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// Extracted text is empty or whitespace-only
    #[error("No text content found in '{0}'")]
    EmptyContent(String),

    /// Bytes of a supported format could not be decoded
    #[error("Failed to extract text from '{filename}': {message}")]
    Extraction { filename: String, message: String },

    /// Embedding provider failure
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Answer generator failure
    #[error("Answer generation failed: {0}")]
    AnswerGeneration(String),

    /// Vector index construction or query error
    #[error("Vector index error: {0}")]
    Index(String),

    /// A question was asked before a document was indexed
    #[error("No document has been indexed in this session")]
    NoDocument,

    /// Unknown session id
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Malformed client request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an extraction error
    pub fn extraction(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an answer generation error
    pub fn answer_generation(message: impl Into<String>) -> Self {
        Self::AnswerGeneration(message.into())
    }

    /// Create an index error
    pub fn index(message: impl Into<String>) -> Self {
        Self::Index(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable machine-readable tag for this error
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::UnsupportedFormat(_) => "unsupported_format",
            Error::EmptyContent(_) => "empty_content",
            Error::Extraction { .. } => "extraction_error",
            Error::Embedding(_) => "embedding_error",
            Error::AnswerGeneration(_) => "answer_generation_error",
            Error::Index(_) => "index_error",
            Error::NoDocument => "no_document",
            Error::SessionNotFound(_) => "not_found",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Internal(_) => "internal_error",
        }
    }

    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::EmptyContent(_) | Error::Extraction { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::NoDocument => StatusCode::CONFLICT,
            Error::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Error::Embedding(_) | Error::AnswerGeneration(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) | Error::Index(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
