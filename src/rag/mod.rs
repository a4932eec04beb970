//! Grounded Retrieval Pipeline
//!
//! This module holds the retrieval and verification core of docqa.
//!
//! # Module Structure
//!
//! - [`rag::chunker`](crate::rag::chunker) - Page-aware sliding-window passages
//! - [`rag::embeddings`](crate::rag::embeddings) - Embedding providers (hashing, Ollama, fastembed)
//! - [`rag::index`](crate::rag::index) - Exact cosine index over one document's passages
//! - [`rag::retriever`](crate::rag::retriever) - Query embedding and ranking
//! - [`rag::cache`](crate::rag::cache) - Fingerprinted on-disk index cache
//! - [`rag::prompt`](crate::rag::prompt) - Grounding instructions and prompt rendering
//! - [`rag::citation`](crate::rag::citation) - Citation and evidence validation
//!
//! # Pipeline
//!
//! 1. **Chunking** - Pages are concatenated and cut into overlapping passages
//! 2. **Indexing** - Every passage is embedded once; vectors are normalized
//! 3. **Retrieval** - The effective query is embedded and ranked exactly
//! 4. **Generation** - The model sees only the retrieved passages
//! 5. **Validation** - Citations and quotes are checked before anything is shown
//!
//! # Example
//!
//! ```ignore
//! use docqa::rag::{chunker::TextChunker, embeddings::HashingEmbedder, index::DocumentIndex};
//! use docqa::rag::{citation, retriever};
//!
//! let passages = TextChunker::new(2000, 400)?.chunk(&pages)?;
//! let embedder = HashingEmbedder::default();
//! let index = DocumentIndex::build(passages, &embedder, 8).await?;
//!
//! let retrieved = retriever::retrieve("What was Q4 revenue?", &index, 5, &embedder).await?;
//! let outcome = citation::review(&generated_text, &retrieved);
//! println!("{}", outcome.surfaced());
//! ```

pub mod cache;
pub mod chunker;
pub mod citation;
pub mod embeddings;
pub mod index;
pub mod prompt;
pub mod retriever;
