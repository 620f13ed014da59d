//! PDF text extraction
//!
//! Pages are extracted one at a time. A page that yields no text is
//! skipped with a warning instead of failing the whole document, so a
//! partially readable PDF still ingests.

use super::Extracted;
use crate::error::{Error, Result};
use tracing::{debug, warn};

/// Join per-page texts, skipping blank pages, and build the metadata map
pub fn assemble_pages(pages: &[String]) -> Extracted {
    let mut kept = Vec::new();
    let mut skipped = Vec::new();

    for (index, page) in pages.iter().enumerate() {
        if page.trim().is_empty() {
            skipped.push(index + 1);
        } else {
            kept.push(page.as_str());
        }
    }

    if !skipped.is_empty() {
        warn!(pages = ?skipped, "Skipped PDF pages with no extractable text");
    }

    Extracted {
        text: kept.join("\n"),
        metadata: serde_json::json!({
            "page_count": pages.len(),
            "pages_with_text": kept.len(),
            "pages_skipped": skipped,
        }),
    }
}

/// Extract text from an in-memory PDF
#[cfg(feature = "pdf")]
pub fn extract_pdf(bytes: &[u8]) -> Result<Extracted> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| Error::SourceUnreadable(format!("Failed to parse PDF: {}", e)))?;
    debug!(pages = pages.len(), "Extracted PDF pages");

    let extracted = assemble_pages(&pages);
    if extracted.text.trim().is_empty() {
        return Err(Error::SourceUnreadable(
            "PDF contains no extractable text".to_string(),
        ));
    }
    Ok(extracted)
}

/// Extract text from an in-memory PDF
#[cfg(not(feature = "pdf"))]
pub fn extract_pdf(_bytes: &[u8]) -> Result<Extracted> {
    debug!("PDF support disabled at compile time");
    Err(Error::SourceUnreadable(
        "PDF support not enabled; rebuild with the 'pdf' feature".to_string(),
    ))
}
