//! Append-only vector index with exact inner-product search.
//!
//! Vectors are L2-normalized on insertion and stored in one contiguous
//! buffer, so the inner product of any two entries is their cosine
//! similarity. Search is an exact O(n) scan, which is acceptable for the
//! single-node corpus sizes this store targets.
//!
//! The index knows nothing about logical deletes: positions are handed out
//! in append order and never reused, and entries are never removed. Callers
//! that overlay delete semantics must over-fetch and filter (see
//! [`crate::store::DocumentStore`]).

use serde::{Deserialize, Serialize};

use reverie_core::error::ReverieError;

/// A single hit returned from a vector search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Append-order position of the matching vector.
    pub position: usize,
    /// Inner product of the normalized query and entry (higher is better).
    pub score: f64,
}

/// Append-only flat index over fixed-dimension float vectors.
///
/// Not internally synchronized: the owning [`crate::store::DocumentStore`]
/// guards the index and its metadata table under a single lock so that the
/// pair can never diverge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    dimension: usize,
    /// Row-major storage: entry `p` occupies `[p * dimension, (p + 1) * dimension)`.
    vectors: Vec<f32>,
}

impl VectorIndex {
    /// Create a new empty index for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    /// The fixed vector dimension of this index.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of vectors stored (equals the next position to be assigned).
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.vectors.len() / self.dimension
        }
    }

    /// Return true if the index contains no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append a vector and return its assigned position.
    ///
    /// The vector is L2-normalized before storage. Positions are assigned
    /// in strict append order starting at 0 and are never reused.
    pub fn add(&mut self, vector: &[f32]) -> Result<usize, ReverieError> {
        if vector.len() != self.dimension {
            return Err(ReverieError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        let position = self.len();
        self.vectors.extend(l2_normalized(vector));
        Ok(position)
    }

    /// Find up to `k` nearest neighbors of `query` by inner product.
    ///
    /// Results are ordered by descending score; ties break by ascending
    /// position so that repeated searches are reproducible.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, ReverieError> {
        if query.len() != self.dimension {
            return Err(ReverieError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let query = l2_normalized(query);
        let mut hits: Vec<SearchHit> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, entry)| SearchHit {
                position,
                score: dot(&query, entry),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.position.cmp(&b.position))
        });
        hits.truncate(k);

        Ok(hits)
    }
}

/// Inner product of two equal-length slices, accumulated in f64.
fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum()
}

/// Return an L2-normalized copy of `v`. A zero vector is returned unchanged.
fn l2_normalized(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
