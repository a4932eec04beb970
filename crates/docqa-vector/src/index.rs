//! Exact (brute-force) cosine index.
//!
//! Documents answered by docqa are small enough (a few thousand passages)
//! that a linear scan is fast, and an exact scan is the only way to make the
//! ranking fully reproducible: the same query against the same vectors always
//! yields the same ids in the same order.

use crate::distance::{dot_product, normalize};
use crate::error::{Error, Result};
use crate::types::{SearchResult, VectorId};
use std::cmp::Ordering;
use tracing::trace;

/// Flat index of L2-normalized vectors with dense ids.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    /// Vector dimensions.
    dimensions: usize,
    /// Normalized vectors; position is the vector id.
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Create an empty index for vectors of `dimensions` components.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::InvalidVector("Dimensions must be > 0".to_string()));
        }

        Ok(Self {
            dimensions,
            vectors: Vec::new(),
        })
    }

    /// Restore an index from vectors that were normalized when first inserted.
    ///
    /// The vectors are taken as-is: normalizing them again could perturb the
    /// last bits of each component and change scores after a round trip.
    pub fn from_normalized(dimensions: usize, vectors: Vec<Vec<f32>>) -> Result<Self> {
        let mut index = Self::new(dimensions)?;
        for vector in &vectors {
            index.check_dimensions(vector)?;
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(Error::InvalidVector(
                    "stored vector contains NaN or infinite components".to_string(),
                ));
            }
        }
        index.vectors = vectors;
        Ok(index)
    }

    /// Vector dimensions.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append a vector, returning its id.
    pub fn push(&mut self, vector: &[f32]) -> Result<VectorId> {
        self.check_dimensions(vector)?;
        let normalized = normalize(vector)?;
        let id = self.vectors.len() as VectorId;
        self.vectors.push(normalized);
        trace!(id, "Inserted vector");
        Ok(id)
    }

    /// Insert a vector under an explicit id, which must be the next id.
    pub fn insert(&mut self, id: VectorId, vector: &[f32]) -> Result<()> {
        let expected = self.vectors.len() as VectorId;
        if id != expected {
            return Err(Error::OutOfSequence { expected, got: id });
        }
        self.push(vector).map(|_| ())
    }

    /// Get a stored (normalized) vector by id.
    pub fn get(&self, id: VectorId) -> Option<&[f32]> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.vectors.get(i))
            .map(Vec::as_slice)
    }

    /// Iterate over stored vectors in id order.
    pub fn vectors(&self) -> impl Iterator<Item = &[f32]> {
        self.vectors.iter().map(Vec::as_slice)
    }

    /// Return the `k` vectors most similar to `query`.
    ///
    /// Results are ordered by descending score; equal scores are ordered by
    /// ascending id.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        self.check_dimensions(query)?;
        let query = normalize(query)?;

        if k == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<SearchResult> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| SearchResult {
                id: i as VectorId,
                score: dot_product(&query, v).clamp(-1.0, 1.0),
            })
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank_order);
            scored.truncate(k);
        }
        scored.sort_by(rank_order);

        Ok(scored)
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// Total order used for ranking: higher score first, then lower id.
fn rank_order(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id))
}
