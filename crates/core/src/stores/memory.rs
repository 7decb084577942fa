use crate::embeddings::Embedder;
use crate::traits::VectorIndex;
use crate::{DocumentChunk, RetrievedMatch, SearchError, SearchFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A chunk together with the vector computed for its text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedChunk {
    #[serde(flatten)]
    pub chunk: DocumentChunk,
    pub vector: Vec<f32>,
}

/// Exhaustive cosine search over chunks held in memory.
pub struct InMemoryIndex<E> {
    embedder: E,
    records: Vec<IndexedChunk>,
    positions: HashMap<String, usize>,
}

impl<E: Embedder> InMemoryIndex<E> {
    pub fn new(embedder: E) -> Self {
        Self::from_records(embedder, Vec::new())
    }

    pub fn from_records(embedder: E, records: Vec<IndexedChunk>) -> Self {
        let mut index = Self {
            embedder,
            records: Vec::with_capacity(records.len()),
            positions: HashMap::new(),
        };
        for record in records {
            index.upsert(record);
        }
        index
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn records(&self) -> &[IndexedChunk] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, chunk_id: &str) -> bool {
        self.positions.contains_key(chunk_id)
    }

    /// Embeds `chunks` without storing them.
    pub fn embed_chunks(&self, chunks: &[DocumentChunk]) -> Result<Vec<IndexedChunk>, SearchError> {
        chunks
            .iter()
            .map(|chunk| {
                Ok(IndexedChunk {
                    chunk: chunk.clone(),
                    vector: self.embedder.embed(&chunk.text)?,
                })
            })
            .collect()
    }

    pub fn extend(&mut self, records: Vec<IndexedChunk>) {
        for record in records {
            self.upsert(record);
        }
    }

    fn upsert(&mut self, record: IndexedChunk) {
        match self.positions.get(&record.chunk.chunk_id) {
            Some(&position) => self.records[position] = record,
            None => {
                self.positions
                    .insert(record.chunk.chunk_id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }
}

impl<E: Embedder> VectorIndex for InMemoryIndex<E> {
    fn add(&mut self, chunks: &[DocumentChunk]) -> Result<(), SearchError> {
        let records = self.embed_chunks(chunks)?;
        self.extend(records);
        Ok(())
    }

    fn search(
        &self,
        query: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<RetrievedMatch>, SearchError> {
        if k == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query)?;
        Ok(rank_by_similarity(&query_vector, &self.records, k, filter))
    }
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot = left.iter().zip(right).map(|(a, b)| a * b).sum::<f32>();
    let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    dot / (left_norm * right_norm)
}

/// Top `k` records by descending cosine similarity. Equal scores keep
/// insertion order.
pub fn rank_by_similarity(
    query_vector: &[f32],
    records: &[IndexedChunk],
    k: usize,
    filter: &SearchFilter,
) -> Vec<RetrievedMatch> {
    let mut scored = records
        .iter()
        .filter(|record| filter.matches(&record.chunk))
        .map(|record| (cosine_similarity(query_vector, &record.vector), &record.chunk))
        .collect::<Vec<_>>();

    scored.sort_by(|left, right| right.0.total_cmp(&left.0));

    scored
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(position, (score, chunk))| RetrievedMatch::from_chunk(chunk, position + 1, score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::test_support::FailingEmbedder;

    fn chunk(id: &str, source: &str, page: u32, text: &str) -> DocumentChunk {
        DocumentChunk {
            chunk_id: id.to_string(),
            text: text.to_string(),
            source: source.to_string(),
            page,
        }
    }

    fn sample_index() -> Result<InMemoryIndex<CharacterNgramEmbedder>, SearchError> {
        let mut index = InMemoryIndex::new(CharacterNgramEmbedder::default());
        index.add(&[
            chunk("a", "Handbook.pdf", 0, "Assessment weight is 40% coursework."),
            chunk("b", "Handbook.pdf", 1, "The library opens at nine in the morning."),
            chunk("c", "Timetable.pdf", 0, "Assessment deadlines are listed per module."),
        ])?;
        Ok(index)
    }

    #[test]
    fn empty_index_returns_no_matches_without_embedding() -> Result<(), SearchError> {
        let index = InMemoryIndex::new(FailingEmbedder);
        let matches = index.search("anything", 5, &SearchFilter::default())?;
        assert!(matches.is_empty());
        Ok(())
    }

    #[test]
    fn most_similar_chunk_ranks_first() -> Result<(), SearchError> {
        let index = sample_index()?;
        let matches = index.search("What is the assessment weight?", 2, &SearchFilter::default())?;

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].rank, 1);
        assert_eq!(matches[1].rank, 2);
        assert_eq!(matches[0].page, Some(0));
        assert!(matches[0].text.contains("40%"));
        assert!(matches[0].score >= matches[1].score);
        Ok(())
    }

    #[test]
    fn source_filter_restricts_results() -> Result<(), SearchError> {
        let index = sample_index()?;
        let matches = index.search("assessment", 5, &SearchFilter::by_source("Timetable.pdf"))?;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].source.as_deref(), Some("Timetable.pdf"));

        let none = index.search("assessment", 5, &SearchFilter::by_source("Missing.pdf"))?;
        assert!(none.is_empty());
        Ok(())
    }

    #[test]
    fn re_adding_a_chunk_replaces_it() -> Result<(), SearchError> {
        let mut index = sample_index()?;
        index.add(&[chunk("a", "Handbook.pdf", 0, "Assessment weight is 50% coursework.")])?;
        assert_eq!(index.len(), 3);
        assert!(index.records()[0].chunk.text.contains("50%"));
        assert!(index.contains("a"));
        assert!(!index.contains("missing"));
        Ok(())
    }

    #[test]
    fn embedding_failures_propagate() {
        let mut index = InMemoryIndex::new(FailingEmbedder);
        let result = index.add(&[chunk("a", "x.pdf", 0, "text")]);
        assert!(matches!(result, Err(SearchError::Request(_))));
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
