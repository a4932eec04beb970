use serde::{Deserialize, Serialize};
use std::fmt;

// ============= Document Types =============

/// Text of one document page, as produced by an extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-based page number.
    pub page: u32,
    pub text: String,
}

impl PageText {
    pub fn new(page: u32, text: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
        }
    }
}

/// An addressable slice of the page-concatenated document.
///
/// `text` is exactly the source characters `char_start..char_end`
/// (offsets count Unicode scalar values, not bytes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub id: usize,
    pub page: u32,
    pub text: String,
    pub char_start: usize,
    pub char_end: usize,
}

impl Passage {
    /// The `(page, chunk_id)` pair generated answers use to cite this passage.
    pub fn citation(&self) -> CitationKey {
        CitationKey {
            page: self.page,
            chunk_id: self.id,
        }
    }
}

/// Identifies a passage the way citation tokens do: `[p<page>:c<chunk_id>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CitationKey {
    pub page: u32,
    pub chunk_id: usize,
}

impl fmt::Display for CitationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[p{}:c{}]", self.page, self.chunk_id)
    }
}

// ============= Retrieval Types =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub passage: Passage,
    /// Cosine similarity to the query, in [-1, 1].
    pub score: f32,
}

/// Ranked passages for one query: descending score, ties by ascending id,
/// no duplicate ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<RetrievedPassage>,
}

impl RetrievalResult {
    pub fn new(hits: Vec<RetrievedPassage>) -> Self {
        Self { hits }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RetrievedPassage> {
        self.hits.iter()
    }

    pub fn passages(&self) -> impl Iterator<Item = &Passage> {
        self.hits.iter().map(|h| &h.passage)
    }

    /// Look up a retrieved passage by chunk id.
    pub fn get(&self, chunk_id: usize) -> Option<&Passage> {
        self.passages().find(|p| p.id == chunk_id)
    }

    pub fn ids(&self) -> Vec<usize> {
        self.passages().map(|p| p.id).collect()
    }
}

// ============= Error Types =============

/// Why a generated answer was rejected by citation validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Format error: {0}")]
    Format(String),

    #[error("Ungrounded citation {citation}: {reason}")]
    UngroundedCitation {
        citation: CitationKey,
        reason: String,
    },

    #[error("Fabricated evidence for {citation}: \"{quote}\" does not appear in the cited passage")]
    FabricatedEvidence { citation: CitationKey, quote: String },
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Index not built: build or load an index before searching")]
    IndexNotBuilt,

    #[error("Cached index does not match this document: {0}")]
    CacheMismatch(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Vector index error: {0}")]
    Vector(#[from] docqa_vector::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Failures of the embedding or generation services, which a caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Embedding(_) | AppError::LLM(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
