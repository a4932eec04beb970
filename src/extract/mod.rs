//! Page-tagged text extraction.
//!
//! Extractors turn a document file into ordered [`PageText`] values. Pages
//! with blank text are skipped but keep their numbers, so later pages are
//! still cited correctly.

use crate::types::{AppError, PageText, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Page separator emitted by `pdftotext` and similar tools.
pub const FORM_FEED: char = '\x0C';

/// Source of page-tagged document text.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Read `path` into pages numbered from 1, in order.
    async fn extract(&self, path: &Path) -> Result<Vec<PageText>>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Pick an extractor from the file extension.
///
/// `.txt`/`.text` (and files without an extension) are read as plain text,
/// `.json` as page-tagged JSON.
pub fn extractor_for(path: &Path) -> Result<Box<dyn Extractor>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        None | Some("txt") | Some("text") => Ok(Box::new(PlainTextExtractor)),
        Some("json") => Ok(Box::new(JsonPagesExtractor)),
        Some(other) => Err(AppError::Extraction(format!(
            "unsupported document type '.{}' for {} (convert it to text or page-tagged JSON first)",
            other,
            path.display()
        ))),
    }
}

async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::Extraction(format!("failed to read {}: {}", path.display(), e)))
}

/// Plain text where a form feed separates pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn split_pages(content: &str) -> Vec<PageText> {
        content
            .split(FORM_FEED)
            .zip(1u32..)
            .filter(|(text, _)| !text.trim().is_empty())
            .map(|(text, page)| PageText::new(page, text.trim_end_matches(['\r', '\n'])))
            .collect()
    }
}

#[async_trait]
impl Extractor for PlainTextExtractor {
    async fn extract(&self, path: &Path) -> Result<Vec<PageText>> {
        let content = read(path).await?;
        let pages = Self::split_pages(&content);
        debug!(path = %path.display(), pages = pages.len(), "Extracted plain text");
        Ok(pages)
    }

    fn name(&self) -> &'static str {
        "text"
    }
}

#[derive(Debug, Deserialize)]
struct JsonPage {
    page: u32,
    text: String,
}

/// JSON array of `{"page": n, "text": "..."}` objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPagesExtractor;

impl JsonPagesExtractor {
    pub fn parse_pages(content: &str) -> Result<Vec<PageText>> {
        let pages: Vec<JsonPage> = serde_json::from_str(content)
            .map_err(|e| AppError::Extraction(format!("invalid page JSON: {}", e)))?;

        let mut previous = 0;
        let mut result = Vec::with_capacity(pages.len());
        for JsonPage { page, text } in pages {
            if page <= previous {
                return Err(AppError::Extraction(format!(
                    "page {} out of order (after page {})",
                    page, previous
                )));
            }
            previous = page;
            if !text.trim().is_empty() {
                result.push(PageText::new(page, text));
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl Extractor for JsonPagesExtractor {
    async fn extract(&self, path: &Path) -> Result<Vec<PageText>> {
        let content = read(path).await?;
        let pages = Self::parse_pages(&content)?;
        debug!(path = %path.display(), pages = pages.len(), "Extracted JSON pages");
        Ok(pages)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
