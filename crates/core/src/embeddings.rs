use crate::error::SearchError;
use crate::http::endpoint_url;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

pub trait Embedder {
    /// Identifies the model so a collection can refuse vectors from another one.
    fn embedding_id(&self) -> String;

    fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError>;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn embedding_id(&self) -> String {
        (**self).embedding_id()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        (**self).embed(text)
    }
}

/// Which embedder to build. Ingestion and search both build from the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingConfig {
    Ollama { base_url: String, model: String },
    Ngram { dimensions: usize },
}

impl EmbeddingConfig {
    pub fn build(&self) -> Box<dyn Embedder> {
        match self {
            Self::Ollama { base_url, model } => Box::new(OllamaEmbedder::new(base_url, model)),
            Self::Ngram { dimensions } => Box::new(CharacterNgramEmbedder {
                dimensions: *dimensions,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl Embedder for CharacterNgramEmbedder {
    fn embedding_id(&self) -> String {
        format!("ngram:{}", self.dimensions.max(1))
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return Ok(vector);
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        Ok(vector)
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

/// Embeddings served by a local Ollama daemon.
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Embedder for OllamaEmbedder {
    fn embedding_id(&self) -> String {
        format!("ollama:{}", self.model)
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let url = endpoint_url(&self.base_url, "api/embeddings")?;
        let response = self
            .client
            .post(url)
            .json(&EmbeddingsRequest {
                model: &self.model,
                prompt: text,
            })
            .send()?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "ollama".to_string(),
                details: format!("embeddings request returned {}", response.status()),
            });
        }

        let payload: EmbeddingsResponse = response.json()?;
        if payload.embedding.is_empty() {
            return Err(SearchError::BackendResponse {
                backend: "ollama".to_string(),
                details: format!("model {} returned an empty embedding", self.model),
            });
        }

        Ok(payload.embedding)
    }
}
