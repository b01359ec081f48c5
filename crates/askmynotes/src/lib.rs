//! askmynotes: answer questions about one uploaded note file
//!
//! A document is read, split into overlapping chunks, embedded, and held in
//! an in-memory vector index. Each question is embedded, the nearest chunks
//! are retrieved, and a language model answers using only those chunks.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::{AppConfig, Credentials};
pub use error::{Error, Result};
pub use pipeline::{Orchestrator, PipelineState};
pub use types::{
    document::{Chunk, Document, Format, Upload},
    query::AskRequest,
    response::{Answer, IngestSummary},
};
