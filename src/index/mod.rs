//! In-memory vector index over chunk embeddings.
//!
//! The index is flat: every query is compared against every stored vector by squared
//! Euclidean distance. It is built once per upload from `(chunk, vector)` pairs and never
//! mutated afterwards.

use thiserror::Error;
use uuid::Uuid;

/// Number of chunks the retriever returns when no explicit `k` is given.
pub const DEFAULT_TOP_K: usize = 4;

/// Errors raised while building or querying the index.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// No chunks were supplied.
    #[error("cannot build an index from zero chunks")]
    Empty,
    /// Chunk and vector counts differ.
    #[error("received {chunks} chunks but {vectors} vectors")]
    LengthMismatch {
        /// Number of chunk texts supplied.
        chunks: usize,
        /// Number of vectors supplied.
        vectors: usize,
    },
    /// A vector's dimension differs from the index dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension fixed by the first vector.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },
}

/// One stored chunk and its embedding.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    /// Identity assigned when the chunk entered the index.
    pub id: Uuid,
    /// Chunk text as produced by the chunker.
    pub text: String,
    vector: Vec<f32>,
}

/// A retrieval hit.
#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    /// The matching chunk.
    pub chunk: &'a IndexedChunk,
    /// Squared Euclidean distance to the query; smaller is closer.
    pub distance: f32,
}

/// Flat nearest-neighbour index.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<IndexedChunk>,
    dimension: usize,
}

impl VectorIndex {
    /// Build an index from chunk texts and their embeddings, paired by position.
    pub fn build(chunks: Vec<String>, vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        if chunks.len() != vectors.len() {
            return Err(IndexError::LengthMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }
        let dimension = vectors.first().map(Vec::len).ok_or(IndexError::Empty)?;
        if let Some(vector) = vectors.iter().find(|vector| vector.len() != dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(text, vector)| IndexedChunk {
                id: Uuid::new_v4(),
                text,
                vector,
            })
            .collect();
        Ok(Self { entries, dimension })
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks. Always `false` for a built index.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimension shared by every stored vector.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Return up to `k` chunks closest to `query`, nearest first.
    ///
    /// Ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk<'_>>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<ScoredChunk<'_>> = self
            .entries
            .iter()
            .map(|chunk| ScoredChunk {
                chunk,
                distance: squared_l2(&chunk.vector, query),
            })
            .collect();
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);
        Ok(scored)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let delta = x - y;
            delta * delta
        })
        .sum()
}
