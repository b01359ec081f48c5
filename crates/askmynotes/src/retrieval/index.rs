//! In-memory nearest-neighbour index over chunk embeddings

use serde::{Deserialize, Serialize};
use simsimd::SpatialSimilarity;

use crate::config::DistanceMetric;
use crate::error::{Error, Result};
use crate::types::Chunk;

/// A retrieved chunk with its distance to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// The matched chunk
    pub chunk: Chunk,
    /// Distance to the query (lower is closer)
    pub distance: f32,
}

/// Query interface over an indexed document
///
/// An index is immutable once built; uploading a new document builds a new one.
pub trait VectorIndex: Send + Sync {
    /// Return up to `k` nearest chunks, closest first
    fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    /// Number of indexed chunks
    fn len(&self) -> usize;

    /// Check if the index holds no chunks
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embedding dimensionality
    fn dimensions(&self) -> usize;
}

/// Builds an index from chunks and their embeddings
pub trait IndexBuilder: Send + Sync {
    fn build(&self, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<Box<dyn VectorIndex>>;
}

/// Exact (brute force) index, the equivalent of a flat FAISS index
#[derive(Debug)]
pub struct FlatIndex {
    metric: DistanceMetric,
    dimensions: usize,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Build an index, checking counts and dimensions
    pub fn build(
        metric: DistanceMetric,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::index("Cannot build an index without chunks"));
        }
        if chunks.len() != embeddings.len() {
            return Err(Error::index(format!(
                "Got {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimensions = embeddings[0].len();
        if dimensions == 0 {
            return Err(Error::index("Embeddings have zero dimensions"));
        }
        if let Some(pos) = embeddings.iter().position(|v| v.len() != dimensions) {
            return Err(Error::index(format!(
                "Embedding {} has {} dimensions, expected {}",
                pos,
                embeddings[pos].len(),
                dimensions
            )));
        }

        Ok(Self {
            metric,
            dimensions,
            chunks,
            vectors: embeddings,
        })
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        let d = match self.metric {
            DistanceMetric::L2 => f32::sqeuclidean(a, b),
            DistanceMetric::Cosine => f32::cosine(a, b),
        };
        d.map(|d| d as f32)
            .ok_or_else(|| Error::index("Vector length mismatch"))
    }
}

impl VectorIndex for FlatIndex {
    fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if embedding.len() != self.dimensions {
            return Err(Error::index(format!(
                "Query has {} dimensions, index has {}",
                embedding.len(),
                self.dimensions
            )));
        }

        let mut scored = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| Ok((i, self.distance(embedding, v)?)))
            .collect::<Result<Vec<(usize, f32)>>>()?;

        // Stable sort keeps source order among equal distances
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, distance)| SearchHit {
                chunk: self.chunks[i].clone(),
                distance,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Builder producing [`FlatIndex`] instances
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatIndexBuilder {
    pub metric: DistanceMetric,
}

impl FlatIndexBuilder {
    pub fn new(metric: DistanceMetric) -> Self {
        Self { metric }
    }
}

impl IndexBuilder for FlatIndexBuilder {
    fn build(&self, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<Box<dyn VectorIndex>> {
        Ok(Box::new(FlatIndex::build(self.metric, chunks, embeddings)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: u32, content: &str) -> Chunk {
        Chunk {
            index,
            content: content.to_string(),
            char_start: 0,
            char_end: content.chars().count(),
        }
    }

    fn sample() -> (Vec<Chunk>, Vec<Vec<f32>>) {
        (
            vec![chunk(0, "north"), chunk(1, "east"), chunk(2, "south")],
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, -1.0]],
        )
    }

    #[test]
    fn test_nearest_first() {
        let (chunks, vectors) = sample();
        let index = FlatIndex::build(DistanceMetric::L2, chunks, vectors).unwrap();

        let hits = index.query(&[0.1, 0.9], 3).unwrap();
        let order: Vec<&str> = hits.iter().map(|h| h.chunk.content.as_str()).collect();
        assert_eq!(order, vec!["north", "east", "south"]);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_k_larger_than_index() {
        let (chunks, vectors) = sample();
        let index = FlatIndex::build(DistanceMetric::L2, chunks, vectors).unwrap();
        assert_eq!(index.query(&[1.0, 0.0], 10).unwrap().len(), 3);
        assert!(index.query(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_cosine_ignores_magnitude() {
        let chunks = vec![chunk(0, "short"), chunk(1, "long")];
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 10.0]];
        let index = FlatIndex::build(DistanceMetric::Cosine, chunks, vectors).unwrap();

        let hits = index.query(&[0.0, 0.5], 1).unwrap();
        assert_eq!(hits[0].chunk.content, "long");
    }

    #[test]
    fn test_ties_keep_source_order() {
        let chunks = vec![chunk(0, "a"), chunk(1, "b")];
        let vectors = vec![vec![1.0, 0.0], vec![1.0, 0.0]];
        let index = FlatIndex::build(DistanceMetric::L2, chunks, vectors).unwrap();

        let hits = index.query(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].chunk.index, 0);
        assert_eq!(hits[1].chunk.index, 1);
    }

    #[test]
    fn test_build_rejects_mismatches() {
        let (chunks, mut vectors) = sample();
        vectors.pop();
        assert!(matches!(
            FlatIndex::build(DistanceMetric::L2, chunks.clone(), vectors),
            Err(Error::Index(_))
        ));

        let ragged = vec![vec![0.0, 1.0], vec![1.0], vec![0.0, -1.0]];
        assert!(FlatIndex::build(DistanceMetric::L2, chunks, ragged).is_err());
        assert!(FlatIndex::build(DistanceMetric::L2, vec![], vec![]).is_err());
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let (chunks, vectors) = sample();
        let index = FlatIndexBuilder::new(DistanceMetric::L2)
            .build(chunks, vectors)
            .unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.dimensions(), 2);
        assert!(index.query(&[1.0, 0.0, 0.0], 1).is_err());
    }
}
