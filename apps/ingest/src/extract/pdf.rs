//! PDF text extraction.

use super::ExtractError;

/// Decodes pages in order and concatenates per-page text, with no added
/// separators beyond what the source embeds.
pub fn extract(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}
