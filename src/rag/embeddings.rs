//! Embedding providers.
//!
//! The same [`Embedder`] (identified by [`Embedder::model_name`]) must be used
//! to build an index and to embed queries against it.

use crate::types::{AppError, Result};
use crate::utils::toml_config::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Black-box text embedding capability.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one text into a vector of [`dimensions`](Self::dimensions) components.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of every vector this embedder returns.
    fn dimensions(&self) -> usize;

    /// Identifier recorded in index caches.
    fn model_name(&self) -> &str;
}

/// Build the embedder selected in configuration.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider {
        EmbeddingProvider::Hashing => Ok(Arc::new(HashingEmbedder::new(config.dimensions)?)),

        #[cfg(feature = "ollama")]
        EmbeddingProvider::Ollama => Ok(Arc::new(OllamaEmbedder::new(
            &config.base_url,
            config.model.clone(),
            config.dimensions,
        ))),
        #[cfg(not(feature = "ollama"))]
        EmbeddingProvider::Ollama => Err(AppError::Config(
            "embedding provider 'ollama' requires the `ollama` feature".to_string(),
        )),

        #[cfg(feature = "local-embeddings")]
        EmbeddingProvider::Fastembed => Ok(Arc::new(FastEmbedder::new(&config.model)?)),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingProvider::Fastembed => Err(AppError::Config(
            "embedding provider 'fastembed' requires the `local-embeddings` feature".to_string(),
        )),
    }
}

/// Split text into lowercase alphanumeric terms, dropping single characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.len() > 1)
        .map(String::from)
        .collect()
}

// ============= Feature hashing =============

/// Offline, deterministic embedder using signed feature hashing of terms.
///
/// Texts sharing terms get positive cosine similarity, which is enough for
/// keyword-style retrieval without a model download.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
    name: String,
}

impl HashingEmbedder {
    pub const DEFAULT_DIMENSIONS: usize = 384;

    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(AppError::Config(
                "embedding dimensions must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            dimensions,
            name: format!("hashing-{}", dimensions),
        })
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket = [0u8; 8];
        bucket.copy_from_slice(&digest[..8]);
        let slot = (u64::from_le_bytes(bucket) % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[slot] += sign;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: Self::DEFAULT_DIMENSIONS,
            name: format!("hashing-{}", Self::DEFAULT_DIMENSIONS),
        }
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; self.dimensions];
        let terms = tokenize(text);

        if terms.is_empty() {
            // Term-free text (punctuation, whitespace) still gets a non-zero vector.
            self.accumulate(&mut vector, text.trim());
        } else {
            for term in &terms {
                self.accumulate(&mut vector, term);
            }
        }

        // Opposite-signed collisions can cancel out completely.
        if vector.iter().all(|x| *x == 0.0) {
            vector[0] = 1.0;
        }

        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

// ============= Ollama =============

#[cfg(feature = "ollama")]
pub use ollama_embedder::OllamaEmbedder;

#[cfg(feature = "ollama")]
mod ollama_embedder {
    use super::*;
    use crate::llm::ollama::connect;
    use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
    use ollama_rs::Ollama;

    /// Embeddings from an Ollama server (`/api/embed`).
    pub struct OllamaEmbedder {
        client: Ollama,
        model: String,
        dimensions: usize,
    }

    impl OllamaEmbedder {
        pub fn new(base_url: &str, model: String, dimensions: usize) -> Self {
            Self {
                client: connect(base_url),
                model,
                dimensions,
            }
        }
    }

    #[async_trait]
    impl Embedder for OllamaEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let request =
                GenerateEmbeddingsRequest::new(self.model.clone(), EmbeddingsInput::from(text));

            let response = self
                .client
                .generate_embeddings(request)
                .await
                .map_err(|e| AppError::Embedding(format!("Ollama embedding error: {}", e)))?;

            let vector = response
                .embeddings
                .into_iter()
                .next()
                .ok_or_else(|| AppError::Embedding("Ollama returned no embedding".to_string()))?;

            if vector.len() != self.dimensions {
                return Err(AppError::Config(format!(
                    "model '{}' returned {} dimensions, configured {}",
                    self.model,
                    vector.len(),
                    self.dimensions
                )));
            }
            Ok(vector)
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn model_name(&self) -> &str {
            &self.model
        }
    }
}

// ============= fastembed =============

#[cfg(feature = "local-embeddings")]
pub use local::FastEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use super::*;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use parking_lot::Mutex;

    /// Local ONNX embedding models via fastembed.
    ///
    /// `TextEmbedding::embed` needs `&mut self`, so the model sits behind a
    /// mutex and runs on the blocking pool.
    pub struct FastEmbedder {
        model: Arc<Mutex<TextEmbedding>>,
        name: String,
        dimensions: usize,
    }

    fn resolve(name: &str) -> Result<(EmbeddingModel, usize)> {
        match name.to_lowercase().as_str() {
            "bge-small-en-v1.5" | "baai/bge-small-en-v1.5" => {
                Ok((EmbeddingModel::BGESmallENV15, 384))
            }
            "bge-base-en-v1.5" | "baai/bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
            "all-minilm" | "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => {
                Ok((EmbeddingModel::AllMiniLML6V2, 384))
            }
            other => Err(AppError::Config(format!(
                "unsupported fastembed model '{}'",
                other
            ))),
        }
    }

    impl FastEmbedder {
        pub fn new(model_name: &str) -> Result<Self> {
            let (model, dimensions) = resolve(model_name)?;
            let model = TextEmbedding::try_new(
                InitOptions::new(model).with_show_download_progress(false),
            )
            .map_err(|e| AppError::Embedding(format!("Failed to load {}: {}", model_name, e)))?;

            Ok(Self {
                model: Arc::new(Mutex::new(model)),
                name: model_name.to_string(),
                dimensions,
            })
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let model = Arc::clone(&self.model);
            let text = text.to_string();

            let mut vectors = tokio::task::spawn_blocking(move || {
                model
                    .lock()
                    .embed(vec![text], None)
                    .map_err(|e| AppError::Embedding(e.to_string()))
            })
            .await
            .map_err(|e| AppError::Internal(format!("embedding task failed: {}", e)))??;

            vectors
                .pop()
                .ok_or_else(|| AppError::Embedding("fastembed returned no embedding".to_string()))
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn model_name(&self) -> &str {
            &self.name
        }
    }
}
