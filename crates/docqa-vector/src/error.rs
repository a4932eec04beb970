//! Error types for docqa-vector.

use thiserror::Error;

/// Result type for docqa-vector operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in docqa-vector operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Dimension mismatch between vector and index.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions.
        expected: usize,
        /// Actual dimensions provided.
        actual: usize,
    },

    /// Invalid vector (e.g., empty, zero norm, contains NaN).
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// Vector id was inserted out of sequence.
    #[error("Vector id {got} out of sequence, expected {expected}")]
    OutOfSequence {
        /// The next id the index accepts.
        expected: u64,
        /// The id that was supplied.
        got: u64,
    },

    /// Persistence error (serialization, inconsistent snapshot, etc.).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
