//! The upload-then-ask pipeline

mod orchestrator;
mod state;

pub use orchestrator::Orchestrator;
pub use state::{PipelineState, Stage, StatusHandle, NO_TEXT_FOUND};
