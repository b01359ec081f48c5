//! Prompt templates for grounded answers

use crate::retrieval::SearchHit;

/// Separator placed between retrieved chunks in the context block
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Prompt builder for context-restricted questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunk texts in rank order
    pub fn build_context(hits: &[SearchHit]) -> String {
        hits.iter()
            .map(|hit| hit.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }

    /// Build the full prompt sent to the model
    ///
    /// The model is told to use only the supplied context. Nothing checks that
    /// it complied.
    pub fn build_prompt(context: &str, question: &str) -> String {
        format!(
            "Answer the question using ONLY the context below.\n\n<context>\n{}\n</context>\n\nQuestion: {}\n",
            context, question
        )
    }
}
