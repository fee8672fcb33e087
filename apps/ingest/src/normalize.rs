//! Canonical plain-text form used for both embedding and storage.

/// Normalizes extracted text: drops blank lines, then collapses all
/// whitespace runs (including newlines) into single spaces and trims.
///
/// Total and deterministic — empty input yields empty output. Callers are
/// responsible for treating an empty result as a terminal validation
/// failure; there is nothing to embed or parse in an empty document.
pub fn normalize(text: &str) -> String {
    let joined = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}
