//! Pipeline states and the shared status view

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::types::{IngestSummary, SessionStatus};

/// Label shown when a document yields no text
pub const NO_TEXT_FOUND: &str = "No text found";

/// Document-processing stage that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reading,
    Extracting,
    Chunking,
    Embedding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Reading => "Reading",
            Stage::Extracting => "Extracting",
            Stage::Chunking => "Chunking",
            Stage::Embedding => "Embedding",
        };
        f.write_str(name)
    }
}

/// Per-document state machine
///
/// `Idle -> Reading -> Extracting -> Chunking -> Embedding -> Indexed`, then
/// any number of `Querying -> Answered` cycles. A document-processing failure
/// is terminal until the next upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Reading,
    Extracting,
    Chunking,
    Embedding,
    Indexed,
    Querying,
    Answered,
    Failed {
        stage: Stage,
        kind: &'static str,
        reason: String,
    },
}

impl PipelineState {
    /// Failed state for an error raised in `stage`
    pub fn failed(stage: Stage, error: &Error) -> Self {
        PipelineState::Failed {
            stage,
            kind: error.kind(),
            reason: error.to_string(),
        }
    }

    /// Stable snake_case name
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Reading => "reading",
            PipelineState::Extracting => "extracting",
            PipelineState::Chunking => "chunking",
            PipelineState::Embedding => "embedding",
            PipelineState::Indexed => "indexed",
            PipelineState::Querying => "querying",
            PipelineState::Answered => "answered",
            PipelineState::Failed { .. } => "failed",
        }
    }

    /// Progress label for display
    pub fn label(&self) -> String {
        match self {
            PipelineState::Idle => "Waiting for a document".to_string(),
            PipelineState::Reading => "Reading file...".to_string(),
            PipelineState::Extracting => "Extracting text...".to_string(),
            PipelineState::Chunking => "Splitting text into chunks...".to_string(),
            PipelineState::Embedding => "Creating embeddings...".to_string(),
            PipelineState::Indexed => "File processed successfully".to_string(),
            PipelineState::Querying => "Searching relevant content...".to_string(),
            PipelineState::Answered => "Answer ready".to_string(),
            PipelineState::Failed { kind: "empty_content", .. } => NO_TEXT_FOUND.to_string(),
            PipelineState::Failed { stage, reason, .. } => format!("{} failed: {}", stage, reason),
        }
    }
}

#[derive(Debug)]
struct Progress {
    state: PipelineState,
    document: Option<IngestSummary>,
    questions_answered: u32,
    created_at: DateTime<Utc>,
}

/// Cloneable read view of an orchestrator's progress
///
/// Readable while the orchestrator itself is busy.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    inner: Arc<RwLock<Progress>>,
}

impl StatusHandle {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Progress {
                state: PipelineState::Idle,
                document: None,
                questions_answered: 0,
                created_at: Utc::now(),
            })),
        }
    }

    /// Current state
    pub fn state(&self) -> PipelineState {
        self.inner.read().state.clone()
    }

    pub(crate) fn set_state(&self, state: PipelineState) {
        tracing::debug!("Pipeline state -> {}", state.name());
        self.inner.write().state = state;
    }

    /// Forget the previous document
    pub(crate) fn reset(&self) {
        let mut progress = self.inner.write();
        progress.state = PipelineState::Idle;
        progress.document = None;
        progress.questions_answered = 0;
    }

    pub(crate) fn indexed(&self, summary: IngestSummary) {
        let mut progress = self.inner.write();
        progress.state = PipelineState::Indexed;
        progress.document = Some(summary);
    }

    pub(crate) fn answered(&self) {
        let mut progress = self.inner.write();
        progress.state = PipelineState::Answered;
        progress.questions_answered += 1;
    }

    /// Serializable snapshot
    pub fn snapshot(&self) -> SessionStatus {
        let progress = self.inner.read();
        let error = match &progress.state {
            PipelineState::Failed { reason, .. } => Some(reason.clone()),
            _ => None,
        };

        SessionStatus {
            state: progress.state.name().to_string(),
            label: progress.state.label(),
            error,
            document: progress.document.clone(),
            questions_answered: progress.questions_answered,
            created_at: progress.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(PipelineState::Reading.label(), "Reading file...");
        assert_eq!(PipelineState::Indexed.label(), "File processed successfully");
        assert_eq!(PipelineState::Answered.label(), "Answer ready");

        let empty = PipelineState::failed(Stage::Extracting, &Error::EmptyContent("a.txt".into()));
        assert_eq!(empty.label(), NO_TEXT_FOUND);

        let embed = PipelineState::failed(Stage::Embedding, &Error::embedding("quota"));
        assert_eq!(
            embed.label(),
            "Embedding failed: Embedding generation failed: quota"
        );
    }

    #[test]
    fn test_snapshot_reports_failure() {
        let handle = StatusHandle::new();
        assert_eq!(handle.snapshot().state, "idle");

        handle.set_state(PipelineState::failed(
            Stage::Reading,
            &Error::UnsupportedFormat("image/png".into()),
        ));
        let status = handle.snapshot();
        assert_eq!(status.state, "failed");
        assert_eq!(status.error.as_deref(), Some("Unsupported file type: image/png"));
        assert!(status.document.is_none());
    }
}
