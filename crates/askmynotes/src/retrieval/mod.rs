//! Retrieval of the chunks closest to a question

mod index;

pub use index::{FlatIndex, FlatIndexBuilder, IndexBuilder, SearchHit, VectorIndex};
