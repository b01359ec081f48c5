//! Document ingestion: text extraction and chunking

mod extractor;
mod splitter;

pub use extractor::TextExtractor;
pub use splitter::{Chunks, TextSplitter};
