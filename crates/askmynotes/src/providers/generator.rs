//! Answer generator trait

use async_trait::async_trait;
use crate::error::Result;

/// Trait for answering a question from retrieved context
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate an answer restricted to `context`
    async fn generate(&self, context: &str, question: &str) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
