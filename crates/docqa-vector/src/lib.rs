//! # docqa-vector
//!
//! A small, pure-Rust exact vector index used by docqa to rank document
//! passages by cosine similarity.
//!
//! ## Features
//!
//! - **Exact search**: every stored vector is scored, no approximation
//! - **Deterministic ranking**: descending score, ties broken by ascending id
//! - **Persistence**: JSON snapshots
//! - **Lossless round trip**: a restored index returns identical results
//!
//! ## Quick Start
//!
//! ```rust
//! use docqa_vector::FlatIndex;
//!
//! # fn main() -> Result<(), docqa_vector::Error> {
//! let mut index = FlatIndex::new(3)?;
//! index.push(&[1.0, 0.0, 0.0])?;
//! index.push(&[0.0, 1.0, 0.0])?;
//!
//! let hits = index.search(&[0.9, 0.1, 0.0], 1)?;
//! assert_eq!(hits[0].id, 0);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod distance;
pub mod error;
pub mod index;
pub mod persistence;
pub mod types;

// Re-exports for convenience
pub use distance::{cosine_similarity, normalize};
pub use error::{Error, Result};
pub use index::FlatIndex;
pub use persistence::{load_index, save_index, Snapshot};
pub use types::{SearchResult, VectorId};
