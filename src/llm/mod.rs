//! LLM Provider Clients
//!
//! Answer generation sits behind the [`LLMClient`] trait so the
//! conversation pipeline works with any provider, including the offline
//! [`extractive::ExtractiveClient`]. Whatever a client returns is validated
//! by [`crate::rag::citation`] before it is shown.
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `ollama` - Local Ollama server (default)
//! - `openai` - OpenAI API and compatible endpoints
//!
//! # Example
//!
//! ```ignore
//! use docqa::llm::Provider;
//!
//! let client = Provider::from_config(&config.llm)?.create_client()?;
//! let text = client.generate_grounded(&request).await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;
/// Offline retrieval-only answers.
pub mod extractive;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{GroundedRequest, LLMClient, Provider};
pub use extractive::ExtractiveClient;
