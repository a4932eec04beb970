//! The per-document embedding index.

use crate::rag::embeddings::Embedder;
use crate::types::{AppError, Passage, Result, RetrievalResult, RetrievedPassage};
use arc_swap::ArcSwapOption;
use docqa_vector::FlatIndex;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Passages of one document and one normalized vector per passage.
///
/// Immutable once built: passage `i` is vector `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentIndex {
    passages: Vec<Passage>,
    vectors: FlatIndex,
    model: String,
}

impl DocumentIndex {
    /// Embed every passage and build the index.
    ///
    /// Up to `concurrency` embedding calls are in flight at once; vectors are
    /// stored in passage order regardless of completion order.
    #[instrument(skip(passages, embedder), fields(passages = passages.len(), model = embedder.model_name()))]
    pub async fn build(
        passages: Vec<Passage>,
        embedder: &dyn Embedder,
        concurrency: usize,
    ) -> Result<Self> {
        if passages.is_empty() {
            return Err(AppError::InvalidInput(
                "document has no text to index".to_string(),
            ));
        }
        check_ids(&passages)?;

        let embeddings: Vec<Vec<f32>> = stream::iter(passages.iter())
            .map(|p| embedder.embed(&p.text))
            .buffered(concurrency.max(1))
            .try_collect()
            .await?;

        let mut vectors = FlatIndex::new(embedder.dimensions())?;
        for (passage, embedding) in passages.iter().zip(&embeddings) {
            vectors.insert(passage.id as u64, embedding)?;
        }

        info!(passages = passages.len(), "Built document index");
        Ok(Self {
            passages,
            vectors,
            model: embedder.model_name().to_string(),
        })
    }

    /// Reassemble an index from stored parts (see `rag::cache`).
    pub fn from_parts(passages: Vec<Passage>, vectors: FlatIndex, model: String) -> Result<Self> {
        if passages.len() != vectors.len() {
            return Err(AppError::CacheMismatch(format!(
                "{} passages but {} vectors",
                passages.len(),
                vectors.len()
            )));
        }
        check_ids(&passages)?;
        Ok(Self {
            passages,
            vectors,
            model,
        })
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn vectors(&self) -> &FlatIndex {
        &self.vectors
    }

    /// Name of the embedding model the vectors came from.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Exact cosine search: top `k` passages, descending score, ties by
    /// ascending passage id.
    #[instrument(level = "debug", skip(self, query_vector))]
    pub fn search(&self, query_vector: &[f32], k: usize) -> Result<RetrievalResult> {
        let hits = self
            .vectors
            .search(query_vector, k)?
            .into_iter()
            .map(|hit| {
                let passage = usize::try_from(hit.id)
                    .ok()
                    .and_then(|i| self.passages.get(i))
                    .cloned()
                    .ok_or_else(|| {
                        AppError::Internal(format!("vector {} has no passage", hit.id))
                    })?;
                Ok(RetrievedPassage {
                    passage,
                    score: hit.score,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(hits = hits.len(), "Searched document index");
        Ok(RetrievalResult::new(hits))
    }
}

/// Passage ids must be `0..n` in order so they double as vector ids.
fn check_ids(passages: &[Passage]) -> Result<()> {
    match passages.iter().enumerate().find(|(i, p)| p.id != *i) {
        Some((i, p)) => Err(AppError::InvalidInput(format!(
            "passage at position {} has id {}",
            i, p.id
        ))),
        None => Ok(()),
    }
}

/// Slot holding the index currently in use.
///
/// Readers take an `Arc` snapshot; a rebuild installs a new index without
/// touching the one readers hold.
#[derive(Debug, Default)]
pub struct SharedIndex {
    slot: ArcSwapOption<DocumentIndex>,
}

impl SharedIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn install(&self, index: DocumentIndex) -> Arc<DocumentIndex> {
        let index = Arc::new(index);
        self.slot.store(Some(Arc::clone(&index)));
        index
    }

    /// The installed index, or [`AppError::IndexNotBuilt`].
    pub fn current(&self) -> Result<Arc<DocumentIndex>> {
        self.slot.load_full().ok_or(AppError::IndexNotBuilt)
    }

    pub fn clear(&self) {
        self.slot.store(None);
    }
}
