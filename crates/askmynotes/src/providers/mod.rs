//! Provider abstractions for embeddings and answer generation
//!
//! The pipeline only sees the traits; the Gemini implementations are injected
//! at startup and test doubles are injected in tests.

pub mod embedding;
pub mod gemini;
pub mod generator;

pub use embedding::EmbeddingProvider;
pub use gemini::{GeminiClient, GeminiEmbedder};
pub use generator::AnswerGenerator;
