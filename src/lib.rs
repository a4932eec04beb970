//! # docqa - grounded question answering over a single document
//!
//! docqa answers natural-language questions using only passages retrieved
//! from one document. Every claim carries a `[pX:cY]` citation, every quote is
//! checked against the passage it cites, and anything that fails the check is
//! replaced by the canonical refusal `Not found in the document.`
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use docqa::llm::ExtractiveClient;
//! use docqa::memory::{Conversation, ConversationSettings};
//! use docqa::rag::{chunker::TextChunker, embeddings::HashingEmbedder, index::DocumentIndex};
//! use docqa::types::PageText;
//! use std::sync::Arc;
//!
//! let pages = vec![PageText::new(13, "Q4 2025 revenue reached $2.5 billion, up 15% YoY.")];
//! let embedder = Arc::new(HashingEmbedder::default());
//! let passages = TextChunker::new(2000, 400)?.chunk(&pages)?;
//! let index = Arc::new(DocumentIndex::build(passages, embedder.as_ref(), 8).await?);
//!
//! let mut conversation = Conversation::new(
//!     index,
//!     embedder,
//!     Arc::new(ExtractiveClient::new()),
//!     ConversationSettings::default(),
//! )?;
//! let turn = conversation.ask("What was Q4 2025 revenue?").await?;
//! println!("{}", turn.surfaced());
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama generation and embeddings (default) |
//! | `openai` | OpenAI and compatible APIs |
//! | `local-embeddings` | fastembed ONNX embedding models |
//!
//! ## Modules
//!
//! - [`extract`] - Page-tagged text extraction
//! - [`rag`] - Chunking, indexing, retrieval, prompting and citation checks
//! - [`memory`] - Conversation sessions and bounded history
//! - [`llm`] - Answer generators
//! - [`cli`] - Command-line parsing and terminal output
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line interface and terminal rendering.
pub mod cli;
/// Document extractors.
pub mod extract;
/// LLM provider clients and abstractions.
pub mod llm;
/// Conversation sessions and history.
pub mod memory;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (documents, passages, errors).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;

// Re-export commonly used types
pub use extract::Extractor;
pub use llm::{LLMClient, Provider};
pub use memory::{Conversation, ConversationSettings, Turn};
pub use rag::citation::{Outcome, NOT_FOUND};
pub use rag::embeddings::Embedder;
pub use rag::index::{DocumentIndex, SharedIndex};
pub use types::{AppError, Result};
pub use utils::toml_config::DocqaConfig;
