//! Text extraction from PDF uploads and web pages
//!
//! Extractors return the raw text plus an opaque metadata map that ingestion
//! logs verbatim. Any failure to produce usable text surfaces as
//! [`crate::error::Error::SourceUnreadable`].

mod pdf;
mod web;

pub use pdf::*;
pub use web::*;

/// Text pulled from a source, with extractor-specific metadata
#[derive(Debug, Clone)]
pub struct Extracted {
    pub text: String,
    pub metadata: serde_json::Value,
}
