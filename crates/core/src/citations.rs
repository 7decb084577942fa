use crate::models::RetrievedMatch;

pub const CONTEXT_DELIMITER: &str = "\n\n---\n";

const MISSING: &str = "?";

pub fn citation_header(found: &RetrievedMatch) -> String {
    let source = found.source.as_deref().unwrap_or(MISSING);
    let page = found
        .page
        .map(|page| page.to_string())
        .unwrap_or_else(|| MISSING.to_string());
    format!("[{source} p.{page}]")
}

/// Renders matches in order as `[source p.page]\ntext` blocks joined by
/// [`CONTEXT_DELIMITER`]. No matches render as an empty string.
pub fn format_citations(matches: &[RetrievedMatch]) -> String {
    matches
        .iter()
        .map(|found| format!("{}\n{}", citation_header(found), found.text))
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}
