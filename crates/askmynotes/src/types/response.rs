//! Response types for ingestion, answers and session status

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::Format;
use crate::retrieval::SearchHit;

/// Outcome of indexing one uploaded document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestSummary {
    /// Original filename
    pub filename: String,
    /// Resolved format
    pub format: Format,
    /// Size of the upload in bytes
    pub file_size: usize,
    /// Page count for paginated formats
    pub pages: Option<u32>,
    /// Characters of extracted text
    pub characters: usize,
    /// Chunks indexed
    pub chunks: usize,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Time spent from reading to indexed
    pub processing_time_ms: u64,
}

/// Generated answer with the context it was allowed to use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The question as asked
    pub question: String,
    /// Generated answer text
    pub answer: String,
    /// Retrieved chunks, closest first
    pub context: Vec<SearchHit>,
    /// Time spent retrieving and generating
    pub processing_time_ms: u64,
}

/// Response for a newly created session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub status: SessionStatus,
}

/// Snapshot of a session's pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Current state name
    pub state: String,
    /// Human-readable progress label
    pub label: String,
    /// Failure reason if the last document failed to process
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Summary of the indexed document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<IngestSummary>,
    /// Questions answered against the current index
    pub questions_answered: u32,
    /// Session creation time
    pub created_at: chrono::DateTime<chrono::Utc>,
}
