//! PDF text extraction.
//!
//! Text is pulled page by page with `pdf-extract` and concatenated in page order. The page-break
//! newlines `pdf-extract` emits ahead of every page are not part of the page text and are
//! dropped, so character counts reflect only what the pages show. There is no OCR: image-only
//! pages contribute nothing, so a scanned paper yields empty text and the pipeline stops before
//! chunking.

use std::path::Path;
use thiserror::Error;

/// Errors raised while reading text out of a PDF.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The PDF could not be read from disk.
    #[error("failed to read PDF: {0}")]
    Io(#[from] std::io::Error),
    /// The PDF could not be opened or parsed.
    #[error("failed to parse PDF: {0}")]
    Pdf(String),
    /// The parser stopped abnormally (for example, it panicked on a malformed file).
    #[error("PDF parser aborted: {0}")]
    Aborted(String),
}

/// Plain text recovered from a PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Ordered concatenation of every page's text.
    pub text: String,
    /// Number of pages the document declares.
    pub page_count: usize,
}

impl ExtractedText {
    /// Length of the text in characters (Unicode scalar values).
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the document carried no usable text at all.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Source of document text for the pipeline.
///
/// Implementations are blocking; the pipeline calls them from a blocking worker thread.
pub trait TextExtractor: Send + Sync {
    /// Extract the full text of the document at `path`.
    fn extract(&self, path: &Path) -> Result<ExtractedText, ExtractionError>;
}

/// [`TextExtractor`] backed by the `pdf-extract` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    /// Construct a new extractor.
    pub const fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedText, ExtractionError> {
        let bytes = std::fs::read(path)?;
        extract_pdf_text(&bytes)
    }
}

const PAGE_BREAK: [char; 2] = ['\n', '\r'];

/// Extract text from in-memory PDF bytes, concatenating pages in order.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<ExtractedText, ExtractionError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|error| ExtractionError::Pdf(error.to_string()))?;
    let page_count = pages.len();
    let text: String = pages
        .iter()
        .map(|page| page.trim_start_matches(PAGE_BREAK))
        .collect();
    tracing::debug!(
        page_count,
        chars = text.chars().count(),
        "Extracted PDF text"
    );
    Ok(ExtractedText { text, page_count })
}
