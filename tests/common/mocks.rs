//! Mock implementations for testing.
//!
//! Deterministic generators, embedders and fixtures shared by the
//! integration tests, so nothing here needs a model server.

#![allow(dead_code)]

use async_trait::async_trait;
use docqa::llm::LLMClient;
use docqa::rag::embeddings::{Embedder, HashingEmbedder};
use docqa::rag::index::DocumentIndex;
use docqa::types::{AppError, Passage, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// The passage every scenario test asks about.
pub const REVENUE_TEXT: &str = "Q4 2025 revenue reached $2.5 billion, up 15% YoY.";

/// A well-formed answer citing `[p13:c42]` with verbatim evidence.
pub const GROUNDED_ANSWER: &str = "Answer:\n\
Q4 2025 revenue was $2.5 billion, up 15% year over year [p13:c42].\n\
\n\
Citations:\n\
[p13:c42]\n\
\n\
Evidence:\n\
[p13:c42] \"Q4 2025 revenue reached $2.5 billion, up 15% YoY.\"";

/// Same shape as [`GROUNDED_ANSWER`] but the quote changes the figure.
pub const FABRICATED_ANSWER: &str = "Answer:\n\
Q4 2025 revenue was $2.6 billion [p13:c42].\n\
\n\
Citations:\n\
[p13:c42]\n\
\n\
Evidence:\n\
[p13:c42] \"Q4 2025 revenue reached $2.6 billion, up 15% YoY.\"";

/// Mock LLM client with scripted responses.
///
/// Responses are returned in order; the last one repeats once the script
/// runs out. Every system/user prompt pair it receives is recorded.
#[derive(Clone)]
pub struct MockLLMClient {
    responses: Arc<Mutex<VecDeque<String>>>,
    prompts: Arc<Mutex<Vec<(String, String)>>>,
    should_fail: bool,
}

impl MockLLMClient {
    /// Create a new mock client that always returns the given response.
    pub fn new(response: &str) -> Self {
        Self::scripted(&[response])
    }

    /// Create a mock client that returns `responses` one per call.
    pub fn scripted(responses: &[&str]) -> Self {
        Self {
            responses: Arc::new(Mutex::new(
                responses.iter().map(|r| r.to_string()).collect(),
            )),
            prompts: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::scripted(&[])
        }
    }

    /// User prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().iter().map(|(_, p)| p.clone()).collect()
    }

    /// System prompts received so far, oldest first.
    pub fn system_prompts(&self) -> Vec<String> {
        self.prompts.lock().iter().map(|(s, _)| s.clone()).collect()
    }

    fn next_response(&self) -> Result<String> {
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        let mut responses = self.responses.lock();
        if responses.len() > 1 {
            responses
                .pop_front()
                .ok_or_else(|| AppError::Internal("empty script".to_string()))
        } else {
            responses
                .front()
                .cloned()
                .ok_or_else(|| AppError::Internal("empty script".to_string()))
        }
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_system("", prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .push((system.to_string(), prompt.to_string()));
        self.next_response()
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Embedder that fails every call, standing in for an unreachable service.
pub struct FailingEmbedder {
    inner: HashingEmbedder,
}

impl FailingEmbedder {
    /// Mirrors the identity of `HashingEmbedder::default()` so indexes match.
    pub fn new() -> Self {
        Self {
            inner: HashingEmbedder::default(),
        }
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(AppError::Embedding("Mock embedding failure".to_string()))
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Filler text that shares no terms with the revenue question.
pub fn filler(id: usize) -> String {
    format!(
        "Facility note {} covers parking permits and cafeteria hours for building {}.",
        id,
        id + 100
    )
}

/// 43 passages over 13 pages; passage 42 on page 13 is [`REVENUE_TEXT`].
pub fn report_passages() -> Vec<Passage> {
    let mut offset = 0;
    (0..=42)
        .map(|id| {
            let (page, text) = if id == 42 {
                (13, REVENUE_TEXT.to_string())
            } else {
                ((id as u32 / 4 + 1).min(12), filler(id))
            };
            let len = text.chars().count();
            let passage = Passage {
                id,
                page,
                text,
                char_start: offset,
                char_end: offset + len,
            };
            offset += len;
            passage
        })
        .collect()
}

/// Index over [`report_passages`] built with the default hashing embedder.
pub async fn report_index() -> (Arc<DocumentIndex>, Arc<HashingEmbedder>) {
    let embedder = Arc::new(HashingEmbedder::default());
    let index = DocumentIndex::build(report_passages(), embedder.as_ref(), 4)
        .await
        .unwrap();
    (Arc::new(index), embedder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_client_script() {
        let client = MockLLMClient::scripted(&["first", "second"]);
        assert_eq!(client.generate("a").await.unwrap(), "first");
        assert_eq!(client.generate("b").await.unwrap(), "second");
        assert_eq!(client.generate("c").await.unwrap(), "second");
        assert_eq!(client.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_mock_client_failing() {
        let client = MockLLMClient::failing();
        assert!(client.generate("prompt").await.is_err());
    }

    #[test]
    fn test_report_fixture() {
        let passages = report_passages();
        assert_eq!(passages.len(), 43);
        assert_eq!(passages[42].page, 13);
        assert_eq!(passages[42].citation().to_string(), "[p13:c42]");
    }
}
