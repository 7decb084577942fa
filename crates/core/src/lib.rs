pub mod answer;
pub mod chunking;
pub mod citations;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
mod http;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod query;
pub mod store;
pub mod stores;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use answer::{build_messages, compose_answer, NO_CONTEXT_HINT, SYSTEM_PROMPT};
pub use chunking::{chunk_pages, split_text, ChunkingConfig};
pub use citations::{format_citations, CONTEXT_DELIMITER};
pub use config::RagConfig;
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, EmbeddingConfig, OllamaEmbedder,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{IngestError, LlmError, QueryError, SearchError};
pub use extractor::{clean_page_text, extract_pdf_pages, PageText, PdfPages};
pub use ingest::{ingest, ingest_pdf};
pub use llm::{build_language_model, ChatMessage, LanguageModel, LlmConfig, ModelReply, Provider};
pub use models::{DocumentChunk, IngestionOptions, RetrievedMatch, SearchFilter};
pub use query::{answer_question, QueryOptions, QuerySession};
pub use store::{open_index, reset_store, ResetOutcome};
pub use stores::{InMemoryIndex, LocalStore, QdrantStore};
pub use traits::VectorIndex;
