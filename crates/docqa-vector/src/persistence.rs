//! Persistence layer for docqa-vector.
//!
//! An index is saved as a single snapshot file holding the dimensions and
//! the already-normalized vectors in id order. Loading never re-normalizes,
//! so a restored index scores every query bit-for-bit like the one that was saved.

use crate::error::{Error, Result};
use crate::index::FlatIndex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// On-disk snapshot of a [`FlatIndex`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Layout version, see [`SNAPSHOT_VERSION`].
    pub version: u32,
    /// Vector dimensions.
    pub dimensions: usize,
    /// Normalized vectors in id order.
    pub vectors: Vec<Vec<f32>>,
}

impl Snapshot {
    /// Capture the contents of an index.
    pub fn capture(index: &FlatIndex) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            dimensions: index.dimensions(),
            vectors: index.vectors().map(<[f32]>::to_vec).collect(),
        }
    }

    /// Rebuild the index this snapshot was captured from.
    pub fn restore(self) -> Result<FlatIndex> {
        if self.version != SNAPSHOT_VERSION {
            return Err(Error::Persistence(format!(
                "Unsupported snapshot version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        FlatIndex::from_normalized(self.dimensions, self.vectors)
    }
}

/// Save an index as a JSON snapshot.
pub async fn save_index(path: &Path, index: &FlatIndex) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string(&Snapshot::capture(index))
        .map_err(|e| Error::Persistence(format!("Failed to serialize snapshot: {}", e)))?;
    tokio::fs::write(path, json).await?;

    info!(path = ?path, vectors = index.len(), "Saved vector snapshot");
    Ok(())
}

/// Load an index from a JSON snapshot.
pub async fn load_index(path: &Path) -> Result<FlatIndex> {
    let json = tokio::fs::read_to_string(path).await?;
    let snapshot: Snapshot = serde_json::from_str(&json)
        .map_err(|e| Error::Persistence(format!("Failed to parse snapshot: {}", e)))?;

    let index = snapshot.restore()?;
    debug!(path = ?path, vectors = index.len(), "Loaded vector snapshot");
    Ok(index)
}
