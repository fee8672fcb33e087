//! DOCX text extraction.
//!
//! A .docx file is a ZIP archive; the body lives in `word/document.xml` as
//! WordprocessingML. Paragraphs are `<w:p>` elements and their text runs are
//! `<w:t>` elements.

use std::io::{Cursor, Read};

use super::ExtractError;

/// Concatenates non-blank paragraph texts, one per line, preserving original
/// order. Blank paragraphs are dropped.
pub fn extract(bytes: &[u8]) -> Result<String, ExtractError> {
    let cursor = Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| ExtractError::Docx(format!("not a ZIP archive: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(format!("missing word/document.xml: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Docx(format!("unreadable document.xml: {e}")))?;

    paragraphs_from_xml(&xml)
}

/// Walks the WordprocessingML event stream, emitting one line per non-blank
/// paragraph.
fn paragraphs_from_xml(xml: &str) -> Result<String, ExtractError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => current.clear(),
                b"w:t" => in_text_run = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(e)) if in_text_run => {
                let text = e
                    .unescape()
                    .map_err(|e| ExtractError::Docx(format!("malformed XML text: {e}")))?;
                current.push_str(&text);
            }
            Ok(quick_xml::events::Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => {
                    if !current.trim().is_empty() {
                        paragraphs.push(current.trim_end().to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(format!("malformed XML: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs.join("\n"))
}
