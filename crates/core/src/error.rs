use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error(
        "no selectable text found in {}. If it's scanned, you need OCR",
        .0.display()
    )]
    NoExtractableText(PathBuf),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("index error: {0}")]
    Index(#[from] SearchError),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("search request failed: {0}")]
    Request(String),

    #[error("collection was built with embedding {expected}, but {found} is configured")]
    EmbeddingMismatch { expected: String, found: String },
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("{0} provider requires an API key")]
    MissingApiKey(String),

    #[error("unknown language model provider: {0} (expected ollama or openai)")]
    UnknownProvider(String),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}
