//! Common types for docqa-vector.

use serde::{Deserialize, Serialize};

/// Identifier of a vector in an index.
///
/// Ids are dense: the n-th inserted vector has id `n`.
pub type VectorId = u64;

/// A single search hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Id of the matched vector.
    pub id: VectorId,
    /// Cosine similarity to the query, in [-1, 1].
    pub score: f32,
}
