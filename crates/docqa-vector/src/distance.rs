//! Similarity kernels.
//!
//! Stored vectors are L2-normalized at insertion time, so cosine similarity
//! between two stored/normalized vectors reduces to a dot product.

use crate::error::{Error, Result};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 means identical direction, or 0.0 when
/// either vector has zero norm.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let denom = (dot_product(a, a) * dot_product(b, b)).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        (dot_product(a, b) / denom).clamp(-1.0, 1.0)
    }
}

/// Compute dot product between two vectors.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    let mut sum = 0.0f32;

    // Manual loop unrolling for better performance
    let chunks = a.len() / 4;
    let remainder = a.len() % 4;

    for i in 0..chunks {
        let base = i * 4;
        sum += a[base] * b[base]
            + a[base + 1] * b[base + 1]
            + a[base + 2] * b[base + 2]
            + a[base + 3] * b[base + 3];
    }

    let start = chunks * 4;
    for i in 0..remainder {
        let idx = start + i;
        sum += a[idx] * b[idx];
    }

    sum
}

/// L2 norm of a vector.
#[inline]
pub fn l2_norm(v: &[f32]) -> f32 {
    dot_product(v, v).sqrt()
}

/// Return an L2-normalized copy of `v`.
///
/// Fails on empty vectors, vectors containing NaN/infinite components and
/// zero vectors, none of which have a direction to compare.
pub fn normalize(v: &[f32]) -> Result<Vec<f32>> {
    if v.is_empty() {
        return Err(Error::InvalidVector("vector is empty".to_string()));
    }
    if v.iter().any(|x| !x.is_finite()) {
        return Err(Error::InvalidVector(
            "vector contains NaN or infinite components".to_string(),
        ));
    }

    let norm = l2_norm(v);
    if norm == 0.0 {
        return Err(Error::InvalidVector("vector has zero norm".to_string()));
    }

    Ok(v.iter().map(|x| x / norm).collect())
}
