use crate::rag::embeddings::Embedder;
use crate::rag::index::DocumentIndex;
use crate::types::{AppError, Result, RetrievalResult};
use tracing::{debug, instrument};

/// Rank the passages of `index` against `effective_query`.
///
/// Deterministic for a fixed index and embedder.
#[instrument(skip(index, embedder), fields(passages = index.len()))]
pub async fn retrieve(
    effective_query: &str,
    index: &DocumentIndex,
    top_k: usize,
    embedder: &dyn Embedder,
) -> Result<RetrievalResult> {
    if top_k < 1 {
        return Err(AppError::Config("top_k must be at least 1".to_string()));
    }
    if embedder.model_name() != index.model() {
        return Err(AppError::Config(format!(
            "index was built with '{}' but queries use '{}'",
            index.model(),
            embedder.model_name()
        )));
    }

    let query_vector = embedder.embed(effective_query).await?;
    let result = index.search(&query_vector, top_k)?;

    debug!(ids = ?result.ids(), "Retrieved passages");
    Ok(result)
}
