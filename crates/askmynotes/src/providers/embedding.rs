//! Embedding provider trait for turning text into vectors

use async_trait::async_trait;
use crate::error::Result;

/// Trait for generating text embeddings
///
/// Every vector returned by one provider has the same length.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text (used for questions)
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts (used for document chunks), one vector per input in order
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Embedding dimensions (768 for text-embedding-004)
    fn dimensions(&self) -> usize;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
