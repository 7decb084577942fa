use serde::{Deserialize, Serialize};

/// One unit of indexed text, cut from a single page of a single PDF.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentChunk {
    pub chunk_id: String,
    pub text: String,
    pub source: String,
    pub page: u32,
}

/// A chunk returned by a similarity search. `rank` starts at 1.
///
/// Metadata is optional because remote backends may hand back records that
/// were written by other tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedMatch {
    pub rank: usize,
    pub score: f32,
    pub text: String,
    pub source: Option<String>,
    pub page: Option<u32>,
}

impl RetrievedMatch {
    pub fn from_chunk(chunk: &DocumentChunk, rank: usize, score: f32) -> Self {
        Self {
            rank,
            score,
            text: chunk.text.clone(),
            source: Some(chunk.source.clone()),
            page: Some(chunk.page),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct SearchFilter {
    pub source: Option<String>,
}

impl SearchFilter {
    pub fn by_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
        }
    }

    pub fn matches(&self, chunk: &DocumentChunk) -> bool {
        match &self.source {
            Some(source) => chunk.source == *source,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1_000,
            chunk_overlap: 150,
        }
    }
}
