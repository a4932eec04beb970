//! Page-aware sliding-window chunking.
//!
//! Pages are concatenated into one source text and cut into fixed-size,
//! overlapping character windows. Every window remembers its exact offsets
//! and the page its first character came from, so a citation can always be
//! traced back to the verbatim source text.

use crate::types::{AppError, PageText, Passage, Result};
use tracing::debug;

/// Inserted between consecutive pages; attributed to the preceding page.
pub const PAGE_SEPARATOR: char = '\n';

/// The page-concatenated document with a page-boundary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    text: String,
    /// `(first char offset, page number)` for every non-empty page, ascending.
    boundaries: Vec<(usize, u32)>,
    /// Byte offset of every char offset, plus one past the end.
    byte_offsets: Vec<usize>,
}

impl SourceText {
    /// Concatenate pages, validating page numbers.
    ///
    /// Page numbers must be 1-based and strictly increasing. Pages with empty
    /// text contribute no characters.
    pub fn from_pages(pages: &[PageText]) -> Result<Self> {
        let mut text = String::new();
        let mut boundaries = Vec::with_capacity(pages.len());
        let mut char_len = 0usize;
        let mut last_page = 0u32;

        for page in pages {
            if page.page == 0 {
                return Err(AppError::InvalidInput(
                    "page numbers are 1-based; got page 0".to_string(),
                ));
            }
            if page.page <= last_page {
                return Err(AppError::InvalidInput(format!(
                    "pages must be in increasing order; page {} follows page {}",
                    page.page, last_page
                )));
            }
            last_page = page.page;

            if page.text.is_empty() {
                continue;
            }
            if !text.is_empty() {
                text.push(PAGE_SEPARATOR);
                char_len += 1;
            }
            boundaries.push((char_len, page.page));
            text.push_str(&page.text);
            char_len += page.text.chars().count();
        }

        let byte_offsets = text
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(text.len()))
            .collect();

        Ok(Self {
            text,
            boundaries,
            byte_offsets,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in chars.
    pub fn char_len(&self) -> usize {
        self.byte_offsets.len() - 1
    }

    /// Characters `start..end` (char offsets).
    pub fn slice(&self, start: usize, end: usize) -> &str {
        &self.text[self.byte_offsets[start]..self.byte_offsets[end]]
    }

    /// Page that the character at `offset` came from.
    pub fn page_at(&self, offset: usize) -> Option<u32> {
        let idx = self.boundaries.partition_point(|(start, _)| *start <= offset);
        idx.checked_sub(1).map(|i| self.boundaries[i].1)
    }
}

/// A chunked document: the source text and its passages.
#[derive(Debug, Clone)]
pub struct ChunkedDocument {
    pub source: SourceText,
    pub passages: Vec<Passage>,
}

/// Fixed-size character window chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Fails with [`AppError::Config`] unless `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be at least 1".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    /// Chunk pages into passages.
    pub fn chunk(&self, pages: &[PageText]) -> Result<Vec<Passage>> {
        Ok(self.chunk_document(pages)?.passages)
    }

    /// Chunk pages, keeping the concatenated source alongside the passages.
    pub fn chunk_document(&self, pages: &[PageText]) -> Result<ChunkedDocument> {
        let source = SourceText::from_pages(pages)?;
        let passages = self.windows(&source);

        debug!(
            pages = pages.len(),
            chars = source.char_len(),
            passages = passages.len(),
            "Chunked document"
        );

        Ok(ChunkedDocument { source, passages })
    }

    fn windows(&self, source: &SourceText) -> Vec<Passage> {
        let len = source.char_len();
        let mut passages = Vec::with_capacity(len / self.stride() + 1);
        let mut start = 0;

        while start < len {
            let end = (start + self.chunk_size).min(len);
            // Every offset below `len` lies on some non-empty page.
            let page = source.page_at(start).unwrap_or(1);

            passages.push(Passage {
                id: passages.len(),
                page,
                text: source.slice(start, end).to_string(),
                char_start: start,
                char_end: end,
            });

            if end == len {
                break;
            }
            start += self.stride();
        }

        passages
    }
}
