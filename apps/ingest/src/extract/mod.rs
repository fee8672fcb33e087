//! Text extraction from uploaded job-description documents.
//!
//! Exactly two binary media types are recognized. Raw text uploads bypass
//! this module entirely — the pipeline uses the caller's text verbatim.

mod docx;
mod pdf;

use thiserror::Error;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

/// Recognized document media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    Docx,
}

impl MediaType {
    pub fn parse(media_type: &str) -> Option<Self> {
        match media_type {
            PDF_MEDIA_TYPE => Some(MediaType::Pdf),
            DOCX_MEDIA_TYPE => Some(MediaType::Docx),
            _ => None,
        }
    }
}

/// Extracts plain text from document bytes based on the declared media type.
///
/// Corrupt input comes back as an error carrying the underlying parse
/// failure, never as a panic.
pub fn extract_text(bytes: &[u8], media_type: &str) -> Result<String, ExtractError> {
    match MediaType::parse(media_type) {
        Some(MediaType::Pdf) => pdf::extract(bytes),
        Some(MediaType::Docx) => docx::extract(bytes),
        None => Err(ExtractError::UnsupportedMediaType(media_type.to_string())),
    }
}
