use crate::embeddings::{EmbeddingConfig, DEFAULT_EMBEDDING_DIMENSIONS};
use crate::llm::{LlmConfig, Provider};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_COLLECTION: &str = "handbook";
pub const DEFAULT_STORE_DIR: &str = "chroma_store/handbook";
pub const DEFAULT_K: usize = 5;
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Process-wide settings, read once at startup and handed to every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RagConfig {
    pub collection: String,
    pub store_dir: PathBuf,
    pub k: usize,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    /// When set, chunks live in this Qdrant server instead of `store_dir`.
    pub qdrant_url: Option<String>,
}

impl Default for RagConfig {
    fn default() -> Self {
        let llm = LlmConfig::default();
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            k: DEFAULT_K,
            embedding: EmbeddingConfig::Ollama {
                base_url: llm.ollama_base_url.clone(),
                model: DEFAULT_EMBEDDING_MODEL.to_string(),
            },
            llm,
            qdrant_url: None,
        }
    }
}

impl RagConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();
        let llm_defaults = defaults.llm.clone();

        let ollama_base_url = get("OLLAMA_BASE_URL").unwrap_or(llm_defaults.ollama_base_url);
        let llm = LlmConfig {
            provider: parse_or_default("LLM_PROVIDER", get("LLM_PROVIDER"), Provider::Ollama),
            model: None,
            ollama_model: get("OLLAMA_MODEL").unwrap_or(llm_defaults.ollama_model),
            openai_model: get("OPENAI_MODEL").unwrap_or(llm_defaults.openai_model),
            ollama_base_url: ollama_base_url.clone(),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(llm_defaults.openai_base_url),
            openai_api_key: get("OPENAI_API_KEY"),
        };

        let embedding_model =
            get("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
        let embedding = match get("EMBEDDING_BACKEND").as_deref() {
            Some("ngram") => EmbeddingConfig::Ngram {
                dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            },
            Some("ollama") | None => EmbeddingConfig::Ollama {
                base_url: ollama_base_url,
                model: embedding_model,
            },
            Some(other) => {
                warn!(value = other, "unknown EMBEDDING_BACKEND, using ollama");
                EmbeddingConfig::Ollama {
                    base_url: ollama_base_url,
                    model: embedding_model,
                }
            }
        };

        Self {
            collection: get("RAG_COLLECTION").unwrap_or(defaults.collection),
            store_dir: get("RAG_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_dir),
            k: parse_or_default("RAG_K", get("RAG_K"), defaults.k),
            llm,
            embedding,
            qdrant_url: get("QDRANT_URL"),
        }
    }
}

fn parse_or_default<T>(key: &str, value: Option<String>, default: T) -> T
where
    T: FromStr,
{
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparseable setting");
            default
        }),
        None => default,
    }
}
