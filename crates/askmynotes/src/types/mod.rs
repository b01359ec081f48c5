//! Core types for the pipeline

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, Document, ExtractedText, Format, Upload};
pub use query::AskRequest;
pub use response::{Answer, IngestSummary, SessionCreated, SessionStatus};
