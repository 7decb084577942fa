use crate::error::IngestError;
use crate::extractor::PageText;
use crate::models::{DocumentChunk, IngestionOptions};
use sha2::{Digest, Sha256};
use tracing::warn;

/// Separators tried in order: paragraph, line, word, then single characters.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, IngestError> {
        if chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk overlap {chunk_overlap} must be smaller than chunk size {chunk_size}"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

impl TryFrom<IngestionOptions> for ChunkingConfig {
    type Error = IngestError;

    fn try_from(value: IngestionOptions) -> Result<Self, Self::Error> {
        Self::new(value.chunk_size, value.chunk_overlap)
    }
}

/// Splits `text` preferring the coarsest separator that keeps pieces under
/// `chunk_size`, then packs neighbouring pieces back together with overlap.
pub fn split_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    split_recursive(text, &DEFAULT_SEPARATORS, config)
}

fn split_recursive(text: &str, separators: &[&str], config: ChunkingConfig) -> Vec<String> {
    let mut separator = "";
    let mut finer: &[&str] = &[];
    for (index, &candidate) in separators.iter().enumerate() {
        if candidate.is_empty() {
            separator = candidate;
            break;
        }
        if text.contains(candidate) {
            separator = candidate;
            finer = &separators[index + 1..];
            break;
        }
    }

    let pieces = split_keeping_separator(text, separator);

    let mut output = Vec::new();
    let mut fitting = Vec::new();
    for piece in pieces {
        if char_len(piece) < config.chunk_size {
            fitting.push(piece);
            continue;
        }

        if !fitting.is_empty() {
            output.extend(merge_pieces(&fitting, config));
            fitting.clear();
        }

        if finer.is_empty() {
            output.push(piece.to_string());
        } else {
            output.extend(split_recursive(piece, finer, config));
        }
    }

    if !fitting.is_empty() {
        output.extend(merge_pieces(&fitting, config));
    }

    output
}

/// Cuts `text` in front of every separator occurrence, so each separator stays
/// attached to the piece that follows it and the pieces concatenate back to
/// `text` exactly. An empty separator yields single characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(start, ch)| &text[start..start + ch.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in text.match_indices(separator) {
        if index > start {
            pieces.push(&text[start..index]);
        }
        start = index;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Greedily packs consecutive pieces up to `chunk_size`, carrying at most
/// `chunk_overlap` characters of trailing pieces into the next chunk. Pieces
/// already hold their separators, so a chunk is always a contiguous span.
fn merge_pieces(pieces: &[&str], config: ChunkingConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: Vec<&str> = Vec::new();
    let mut total = 0usize;

    for &piece in pieces {
        let piece_len = char_len(piece);

        if total + piece_len > config.chunk_size {
            if total > config.chunk_size {
                warn!(
                    length = total,
                    chunk_size = config.chunk_size,
                    "created a chunk longer than the configured size"
                );
            }

            if !window.is_empty() {
                push_joined(&mut chunks, &window);

                while total > config.chunk_overlap
                    || (total > 0 && total + piece_len > config.chunk_size)
                {
                    let dropped = window.remove(0);
                    total -= char_len(dropped);
                }
            }
        }

        window.push(piece);
        total += piece_len;
    }

    push_joined(&mut chunks, &window);
    chunks
}

fn push_joined(chunks: &mut Vec<String>, window: &[&str]) {
    let joined = window.concat();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Chunks every page independently so no chunk spans two pages.
pub fn chunk_pages<I>(pages: I, config: ChunkingConfig) -> Vec<DocumentChunk>
where
    I: IntoIterator<Item = PageText>,
{
    let mut chunks = Vec::new();
    for page in pages {
        for (index, text) in split_text(&page.text, config).into_iter().enumerate() {
            chunks.push(DocumentChunk {
                chunk_id: make_chunk_id(&page.source, page.page, index, &text),
                text,
                source: page.source.clone(),
                page: page.page,
            });
        }
    }
    chunks
}

fn make_chunk_id(source: &str, page: u32, index: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(page.to_le_bytes());
    hasher.update((index as u64).to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u32, text: &str) -> PageText {
        PageText {
            source: "Handbook.pdf".to_string(),
            page,
            text: text.to_string(),
        }
    }

    fn long_text(words: usize) -> String {
        (0..words)
            .map(|index| format!("word{index:03}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        assert!(ChunkingConfig::new(100, 100).is_err());
        assert!(ChunkingConfig::new(0, 0).is_err());
        assert!(ChunkingConfig::new(100, 20).is_ok());
        assert!(ChunkingConfig::try_from(IngestionOptions::default()).is_ok());
    }

    #[test]
    fn short_text_is_a_single_chunk() -> Result<(), IngestError> {
        let config = ChunkingConfig::new(1_000, 150)?;
        let chunks = split_text("Assessment weight is 40% coursework.", config);
        assert_eq!(chunks, vec!["Assessment weight is 40% coursework.".to_string()]);
        Ok(())
    }

    #[test]
    fn chunks_never_exceed_size_when_words_fit() -> Result<(), IngestError> {
        let config = ChunkingConfig::new(50, 10)?;
        let chunks = split_text(&long_text(60), config);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50, "chunk too long: {chunk:?}");
            assert!(!chunk.is_empty());
        }
        Ok(())
    }

    #[test]
    fn adjacent_chunks_share_bounded_overlap() -> Result<(), IngestError> {
        let config = ChunkingConfig::new(50, 16)?;
        let chunks = split_text(&long_text(40), config);
        assert!(chunks.len() > 1);

        for pair in chunks.windows(2) {
            let first_words = pair[0].split(' ').collect::<Vec<_>>();
            let next_first = pair[1].split(' ').next().unwrap_or_default();
            let position = first_words
                .iter()
                .position(|word| *word == next_first)
                .expect("next chunk should start inside the previous one");
            let shared = first_words[position..].join(" ");
            assert!(!shared.is_empty());
            assert!(shared.chars().count() <= 16);
            assert!(pair[1].starts_with(&shared));
        }
        Ok(())
    }

    #[test]
    fn unbroken_word_is_cut_into_characters() -> Result<(), IngestError> {
        let config = ChunkingConfig::new(10, 2)?;
        let chunks = split_text(&"x".repeat(25), config);
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 10));
        Ok(())
    }

    #[test]
    fn paragraph_breaks_are_preferred() -> Result<(), IngestError> {
        let config = ChunkingConfig::new(40, 5)?;
        let text = "First paragraph is short.\n\nSecond paragraph is short.";
        let chunks = split_text(text, config);
        assert_eq!(
            chunks,
            vec![
                "First paragraph is short.".to_string(),
                "Second paragraph is short.".to_string()
            ]
        );
        Ok(())
    }

    #[test]
    fn whitespace_runs_are_kept_verbatim() -> Result<(), IngestError> {
        let config = ChunkingConfig::new(1_000, 150)?;
        let text = "Module one  Coursework 40%   weight";
        assert_eq!(split_text(text, config), vec![text.to_string()]);
        Ok(())
    }

    #[test]
    fn every_chunk_is_a_span_of_the_page() -> Result<(), IngestError> {
        let config = ChunkingConfig::new(60, 12)?;
        let text = (0..30)
            .map(|index| match index % 4 {
                0 => format!("Section {index}.\n\n"),
                1 => format!("weight  {index}%  "),
                2 => format!("line {index}\n"),
                _ => format!("word{index:03}   "),
            })
            .collect::<String>();
        let chunks = split_text(&text, config);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(text.contains(chunk.as_str()), "not a span of the page: {chunk:?}");
            assert!(chunk.chars().count() <= 60);
        }
        Ok(())
    }

    #[test]
    fn separator_split_reassembles_exactly() {
        let text = "a  b\n\n\n\nc ";
        for separator in DEFAULT_SEPARATORS {
            assert_eq!(split_keeping_separator(text, separator).concat(), text);
        }
        assert_eq!(split_keeping_separator("a  b", " "), vec!["a", " ", " b"]);
    }

    #[test]
    fn chunks_inherit_page_metadata_and_never_span_pages() -> Result<(), IngestError> {
        let config = ChunkingConfig::new(40, 8)?;
        let pages = vec![page(0, &long_text(12)), page(3, "tail page")];
        let chunks = chunk_pages(pages, config);

        assert!(chunks.iter().any(|chunk| chunk.page == 0));
        let last = chunks.last().expect("chunks");
        assert_eq!(last.page, 3);
        assert_eq!(last.text, "tail page");
        assert!(chunks.iter().all(|chunk| chunk.source == "Handbook.pdf"));
        assert!(chunks
            .iter()
            .filter(|chunk| chunk.page == 0)
            .all(|chunk| !chunk.text.contains("tail")));
        Ok(())
    }

    #[test]
    fn chunk_ids_are_stable_and_distinct() -> Result<(), IngestError> {
        let config = ChunkingConfig::new(40, 8)?;
        let first = chunk_pages(vec![page(0, &long_text(12))], config);
        let second = chunk_pages(vec![page(0, &long_text(12))], config);
        assert_eq!(first, second);

        let mut ids = first.iter().map(|chunk| chunk.chunk_id.as_str()).collect::<Vec<_>>();
        ids.dedup();
        assert_eq!(ids.len(), first.len());
        Ok(())
    }
}
