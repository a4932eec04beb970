//! Retrieval-only answers.
//!
//! Used when no model is configured. The answer quotes the opening sentence
//! of the best-ranked passage verbatim, in the standard answer skeleton, so
//! it passes through the same validation as generated text.

use crate::llm::client::{GroundedRequest, LLMClient};
use crate::rag::citation::{collapse_whitespace, NOT_FOUND};
use crate::types::{Passage, Result};
use async_trait::async_trait;

/// Longest quote taken from a passage, in chars.
const MAX_QUOTE_CHARS: usize = 300;

#[derive(Debug, Clone, Default)]
pub struct ExtractiveClient;

impl ExtractiveClient {
    pub fn new() -> Self {
        Self
    }

    /// Opening sentence of the passage with whitespace collapsed.
    pub fn leading_sentence(passage: &Passage) -> String {
        let text = collapse_whitespace(&passage.text);
        let mut end = text.len();

        let mut chars = text.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if matches!(c, '.' | '!' | '?')
                && chars.peek().is_none_or(|(_, next)| next.is_whitespace())
            {
                end = i + c.len_utf8();
                break;
            }
        }

        let sentence = &text[..end];
        match sentence.char_indices().nth(MAX_QUOTE_CHARS) {
            Some((cut, _)) => sentence[..cut].trim_end().to_string(),
            None => sentence.to_string(),
        }
    }

    fn answer(request: &GroundedRequest<'_>) -> String {
        let Some(top) = request.retrieved.passages().next() else {
            return NOT_FOUND.to_string();
        };
        let quote = Self::leading_sentence(top);
        if quote.is_empty() {
            return NOT_FOUND.to_string();
        }

        let citation = top.citation();
        format!(
            "Answer:\nThe most relevant passage states: {quote} {citation}\n\n\
             Citations:\n{citation}\n\n\
             Evidence:\n{citation} \"{quote}\""
        )
    }
}

#[async_trait]
impl LLMClient for ExtractiveClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(NOT_FOUND.to_string())
    }

    async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
        Ok(NOT_FOUND.to_string())
    }

    async fn generate_grounded(&self, request: &GroundedRequest<'_>) -> Result<String> {
        Ok(Self::answer(request))
    }

    fn model_name(&self) -> &str {
        "extractive"
    }
}
