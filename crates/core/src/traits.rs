use crate::{DocumentChunk, RetrievedMatch, SearchError, SearchFilter};

/// The vector store as seen by the pipelines: embed-and-store, and
/// embed-and-rank. Indexing internals belong to the implementation.
pub trait VectorIndex {
    fn add(&mut self, chunks: &[DocumentChunk]) -> Result<(), SearchError>;

    /// At most `k` matches, most similar first. An empty index or a filter
    /// nothing passes yields an empty list, not an error.
    fn search(
        &self,
        query: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<RetrievedMatch>, SearchError>;
}

impl<V: VectorIndex + ?Sized> VectorIndex for Box<V> {
    fn add(&mut self, chunks: &[DocumentChunk]) -> Result<(), SearchError> {
        (**self).add(chunks)
    }

    fn search(
        &self,
        query: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<RetrievedMatch>, SearchError> {
        (**self).search(query, k, filter)
    }
}
