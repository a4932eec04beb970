//! On-disk index cache.
//!
//! Each document gets a directory under the cache root:
//!
//! ```text
//! data/index/<document-stem>/
//!     manifest.json   fingerprint, model, chunking, counts, created_at
//!     passages.json   passage metadata and text
//!     vectors.json    docqa-vector snapshot
//! ```
//!
//! # Fingerprint
//!
//! The fingerprint is a SHA-256 over the page texts, the chunking parameters
//! and the embedding model identity. A cache entry is only reused when the
//! fingerprint matches exactly; anything else is a [`AppError::CacheMismatch`]
//! and the caller rebuilds.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::rag::chunker::TextChunker;
use crate::rag::embeddings::Embedder;
use crate::rag::index::DocumentIndex;
use crate::types::{AppError, PageText, Passage, Result};

const MANIFEST_FILE: &str = "manifest.json";
const PASSAGES_FILE: &str = "passages.json";
const VECTORS_FILE: &str = "vectors.json";

// ============================================================================
// Fingerprint
// ============================================================================

/// Identity of an index: which text, chunked how, embedded by what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Hex SHA-256 over everything below plus the page texts.
    pub digest: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub model: String,
    pub dimensions: usize,
    pub page_count: usize,
}

impl Fingerprint {
    pub fn compute(pages: &[PageText], chunker: &TextChunker, embedder: &dyn Embedder) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"docqa-index-v1\0");
        for page in pages {
            hasher.update(page.page.to_le_bytes());
            hasher.update((page.text.len() as u64).to_le_bytes());
            hasher.update(page.text.as_bytes());
        }
        hasher.update((chunker.chunk_size() as u64).to_le_bytes());
        hasher.update((chunker.chunk_overlap() as u64).to_le_bytes());
        hasher.update(embedder.model_name().as_bytes());
        hasher.update(b"\0");
        hasher.update((embedder.dimensions() as u64).to_le_bytes());

        Self {
            digest: hex::encode(hasher.finalize()),
            chunk_size: chunker.chunk_size(),
            chunk_overlap: chunker.chunk_overlap(),
            model: embedder.model_name().to_string(),
            dimensions: embedder.dimensions(),
            page_count: pages.len(),
        }
    }
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(flatten)]
    pub fingerprint: Fingerprint,
    pub passage_count: usize,
    pub created_at: DateTime<Utc>,
}

/// How [`IndexCache::load_or_build`] obtained its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Reused a matching cache entry.
    Hit,
    /// No entry existed; built and saved.
    Miss,
    /// An entry existed but did not match; rebuilt and replaced.
    Rebuilt,
}

// ============================================================================
// Cache
// ============================================================================

/// Directory-per-document index cache.
#[derive(Debug, Clone)]
pub struct IndexCache {
    root: PathBuf,
}

impl IndexCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache entry name for a document path: its file stem.
    pub fn entry_name(document: &Path) -> String {
        document
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "document".to_string())
    }

    pub fn entry_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Load a cached index.
    ///
    /// `Ok(None)` when no entry exists; [`AppError::CacheMismatch`] when the
    /// entry was built for different input or is internally inconsistent.
    pub async fn load(&self, name: &str, fingerprint: &Fingerprint) -> Result<Option<DocumentIndex>> {
        let dir = self.entry_dir(name);
        let manifest_path = dir.join(MANIFEST_FILE);
        if !tokio::fs::try_exists(&manifest_path).await? {
            debug!(entry = name, "No cached index");
            return Ok(None);
        }

        let manifest: Manifest =
            serde_json::from_str(&tokio::fs::read_to_string(&manifest_path).await?)?;
        if manifest.fingerprint != *fingerprint {
            return Err(AppError::CacheMismatch(format!(
                "entry '{}' has fingerprint {} (model {}), expected {} (model {})",
                name,
                short(&manifest.fingerprint.digest),
                manifest.fingerprint.model,
                short(&fingerprint.digest),
                fingerprint.model
            )));
        }

        let passages: Vec<Passage> =
            serde_json::from_str(&tokio::fs::read_to_string(dir.join(PASSAGES_FILE)).await?)?;
        let vectors = docqa_vector::load_index(&dir.join(VECTORS_FILE)).await?;

        if passages.len() != manifest.passage_count {
            return Err(AppError::CacheMismatch(format!(
                "manifest lists {} passages, found {}",
                manifest.passage_count,
                passages.len()
            )));
        }
        if vectors.dimensions() != fingerprint.dimensions {
            return Err(AppError::CacheMismatch(format!(
                "stored vectors have {} dimensions, expected {}",
                vectors.dimensions(),
                fingerprint.dimensions
            )));
        }

        let index = DocumentIndex::from_parts(passages, vectors, manifest.fingerprint.model)?;
        info!(entry = name, passages = index.len(), "Loaded cached index");
        Ok(Some(index))
    }

    /// Write an index and its manifest, replacing any previous entry.
    pub async fn save(&self, name: &str, fingerprint: &Fingerprint, index: &DocumentIndex) -> Result<()> {
        let dir = self.entry_dir(name);
        tokio::fs::create_dir_all(&dir).await?;

        // The manifest is written last so a partial write never looks valid.
        match tokio::fs::remove_file(dir.join(MANIFEST_FILE)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tokio::fs::write(
            dir.join(PASSAGES_FILE),
            serde_json::to_string(index.passages())?,
        )
        .await?;
        docqa_vector::save_index(&dir.join(VECTORS_FILE), index.vectors()).await?;

        let manifest = Manifest {
            fingerprint: fingerprint.clone(),
            passage_count: index.len(),
            created_at: Utc::now(),
        };
        tokio::fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest)?,
        )
        .await?;

        info!(entry = name, path = ?dir, "Saved index cache");
        Ok(())
    }

    /// Remove a cache entry. Missing entries are not an error.
    pub async fn invalidate(&self, name: &str) -> Result<()> {
        let dir = self.entry_dir(name);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!(entry = name, "Invalidated index cache");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reuse the cached index for `pages` or build (and cache) a new one.
    pub async fn load_or_build(
        &self,
        name: &str,
        pages: &[PageText],
        chunker: &TextChunker,
        embedder: &dyn Embedder,
        concurrency: usize,
    ) -> Result<(DocumentIndex, CacheStatus)> {
        let fingerprint = Fingerprint::compute(pages, chunker, embedder);

        let status = match self.load(name, &fingerprint).await {
            Ok(Some(index)) => return Ok((index, CacheStatus::Hit)),
            Ok(None) => CacheStatus::Miss,
            Err(e) => {
                warn!(entry = name, error = %e, "Discarding unusable index cache");
                self.invalidate(name).await?;
                CacheStatus::Rebuilt
            }
        };

        let passages = chunker.chunk(pages)?;
        let index = DocumentIndex::build(passages, embedder, concurrency).await?;
        self.save(name, &fingerprint, &index).await?;

        Ok((index, status))
    }
}

fn short(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::embeddings::HashingEmbedder;
    use tempfile::TempDir;

    fn pages() -> Vec<PageText> {
        vec![
            PageText::new(1, "Revenue grew in the fourth quarter."),
            PageText::new(2, "Headcount stayed flat across regions."),
        ]
    }

    #[test]
    fn test_fingerprint_tracks_inputs() {
        let embedder = HashingEmbedder::default();
        let chunker = TextChunker::new(20, 5).unwrap();
        let base = Fingerprint::compute(&pages(), &chunker, &embedder);

        assert_eq!(base, Fingerprint::compute(&pages(), &chunker, &embedder));

        let mut edited = pages();
        edited[1].text.push('!');
        assert_ne!(base.digest, Fingerprint::compute(&edited, &chunker, &embedder).digest);

        let rechunked = TextChunker::new(20, 6).unwrap();
        assert_ne!(base.digest, Fingerprint::compute(&pages(), &rechunked, &embedder).digest);

        let other_model = HashingEmbedder::new(128).unwrap();
        assert_ne!(base.digest, Fingerprint::compute(&pages(), &chunker, &other_model).digest);
    }

    #[test]
    fn test_entry_name_uses_stem() {
        assert_eq!(IndexCache::entry_name(Path::new("docs/report.pdf")), "report");
        assert_eq!(IndexCache::entry_name(Path::new("notes")), "notes");
    }

    #[tokio::test]
    async fn test_load_missing_entry() {
        let dir = TempDir::new().unwrap();
        let cache = IndexCache::new(dir.path());
        let embedder = HashingEmbedder::default();
        let chunker = TextChunker::new(20, 5).unwrap();
        let fp = Fingerprint::compute(&pages(), &chunker, &embedder);

        assert!(cache.load("report", &fp).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_or_build_then_hit() {
        let dir = TempDir::new().unwrap();
        let cache = IndexCache::new(dir.path());
        let embedder = HashingEmbedder::default();
        let chunker = TextChunker::new(20, 5).unwrap();

        let (built, status) = cache
            .load_or_build("report", &pages(), &chunker, &embedder, 4)
            .await
            .unwrap();
        assert_eq!(status, CacheStatus::Miss);
        assert!(dir.path().join("report").join(MANIFEST_FILE).exists());

        let (loaded, status) = cache
            .load_or_build("report", &pages(), &chunker, &embedder, 4)
            .await
            .unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(loaded, built);

        let query = embedder.embed("fourth quarter revenue").await.unwrap();
        assert_eq!(loaded.search(&query, 3).unwrap(), built.search(&query, 3).unwrap());
    }

    #[tokio::test]
    async fn test_changed_document_is_mismatch() {
        let dir = TempDir::new().unwrap();
        let cache = IndexCache::new(dir.path());
        let embedder = HashingEmbedder::default();
        let chunker = TextChunker::new(20, 5).unwrap();
        cache
            .load_or_build("report", &pages(), &chunker, &embedder, 1)
            .await
            .unwrap();

        let mut edited = pages();
        edited.push(PageText::new(3, "A new appendix."));
        let fp = Fingerprint::compute(&edited, &chunker, &embedder);
        assert!(matches!(
            cache.load("report", &fp).await,
            Err(AppError::CacheMismatch(_))
        ));

        let (index, status) = cache
            .load_or_build("report", &edited, &chunker, &embedder, 1)
            .await
            .unwrap();
        assert_eq!(status, CacheStatus::Rebuilt);
        assert!(index.passages().iter().any(|p| p.page == 3));
    }

    #[tokio::test]
    async fn test_truncated_passages_are_mismatch() {
        let dir = TempDir::new().unwrap();
        let cache = IndexCache::new(dir.path());
        let embedder = HashingEmbedder::default();
        let chunker = TextChunker::new(10, 2).unwrap();
        let (index, _) = cache
            .load_or_build("report", &pages(), &chunker, &embedder, 1)
            .await
            .unwrap();
        assert!(index.len() > 1);

        let short_list = serde_json::to_string(&index.passages()[..1]).unwrap();
        tokio::fs::write(dir.path().join("report").join(PASSAGES_FILE), short_list)
            .await
            .unwrap();

        let fp = Fingerprint::compute(&pages(), &chunker, &embedder);
        assert!(matches!(
            cache.load("report", &fp).await,
            Err(AppError::CacheMismatch(_))
        ));
    }

    #[tokio::test]
    async fn test_save_replaces_entry() {
        let dir = TempDir::new().unwrap();
        let cache = IndexCache::new(dir.path());
        let embedder = HashingEmbedder::default();
        let chunker = TextChunker::new(20, 5).unwrap();
        let fp = Fingerprint::compute(&pages(), &chunker, &embedder);
        let (index, _) = cache
            .load_or_build("report", &pages(), &chunker, &embedder, 1)
            .await
            .unwrap();

        cache.save("report", &fp, &index).await.unwrap();
        assert_eq!(cache.load("report", &fp).await.unwrap(), Some(index));
    }

    #[tokio::test]
    async fn test_save_reports_unremovable_manifest() {
        let dir = TempDir::new().unwrap();
        let cache = IndexCache::new(dir.path());
        let embedder = HashingEmbedder::default();
        let chunker = TextChunker::new(20, 5).unwrap();
        let fp = Fingerprint::compute(&pages(), &chunker, &embedder);
        let passages = chunker.chunk(&pages()).unwrap();
        let index = DocumentIndex::build(passages, &embedder, 1).await.unwrap();

        // A directory where the manifest belongs cannot be removed as a file.
        std::fs::create_dir_all(cache.entry_dir("report").join(MANIFEST_FILE)).unwrap();
        assert!(cache.save("report", &fp, &index).await.is_err());
    }

    #[tokio::test]
    async fn test_invalidate() {
        let dir = TempDir::new().unwrap();
        let cache = IndexCache::new(dir.path());
        let embedder = HashingEmbedder::default();
        let chunker = TextChunker::new(20, 5).unwrap();
        cache
            .load_or_build("report", &pages(), &chunker, &embedder, 1)
            .await
            .unwrap();

        cache.invalidate("report").await.unwrap();
        assert!(!cache.entry_dir("report").exists());
        cache.invalidate("report").await.unwrap();
    }
}
