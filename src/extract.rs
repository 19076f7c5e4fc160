//! PDF text extraction.
//!
//! Turns the bytes of a paginated document into one string, page by page.
//! A document that cannot be parsed, or that yields only whitespace, is an
//! expected outcome ([`Extraction::Failed`]) rather than an error to bubble up.

use std::io::Read;
use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use crate::models::ExtractedText;

/// Why a document produced no usable text.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionFailure {
    #[error("document stream could not be read: {0}")]
    Unreadable(#[from] std::io::Error),
    #[error("document is not a readable PDF: {0}")]
    Malformed(String),
    #[error("document has no parsable text")]
    NoText,
}

/// Outcome of running the extractor over one document.
#[derive(Debug)]
pub enum Extraction {
    Text(ExtractedText),
    Failed(ExtractionFailure),
}

impl Extraction {
    pub fn into_result(self) -> Result<ExtractedText, ExtractionFailure> {
        match self {
            Extraction::Text(text) => Ok(text),
            Extraction::Failed(reason) => Err(reason),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Extraction::Text(_))
    }
}

/// Read a document stream to the end and extract its text.
pub fn extract<R: Read>(mut reader: R) -> Extraction {
    let mut bytes = Vec::new();
    if let Err(e) = reader.read_to_end(&mut bytes) {
        return Extraction::Failed(ExtractionFailure::Unreadable(e));
    }
    extract_bytes(&bytes)
}

/// Extract the text of an in-memory document.
pub fn extract_bytes(bytes: &[u8]) -> Extraction {
    let pages = match read_pages(bytes) {
        Ok(pages) => pages,
        Err(reason) => return Extraction::Failed(reason),
    };

    let page_count = pages.len();
    let text: String = pages.concat();
    debug!(pages = page_count, chars = text.len(), "extracted document text");

    match ExtractedText::new(text) {
        Some(text) => Extraction::Text(text),
        None => Extraction::Failed(ExtractionFailure::NoText),
    }
}

fn read_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractionFailure> {
    // pdf-extract can panic on some malformed inputs; those count as unparsable.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }));
    match outcome {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(ExtractionFailure::Malformed(e.to_string())),
        Err(_) => Err(ExtractionFailure::Malformed(
            "PDF parser aborted".to_string(),
        )),
    }
}
