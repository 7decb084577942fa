use crate::embeddings::Embedder;
use crate::http::endpoint_url;
use crate::traits::VectorIndex;
use crate::{DocumentChunk, RetrievedMatch, SearchError, SearchFilter};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::info;

/// A collection on a Qdrant server, reached over its REST API.
pub struct QdrantStore<E> {
    endpoint: String,
    collection: String,
    client: Client,
    embedder: E,
}

impl<E: Embedder> QdrantStore<E> {
    pub fn new(endpoint: impl Into<String>, collection: impl Into<String>, embedder: E) -> Self {
        Self {
            endpoint: endpoint.into(),
            collection: collection.into(),
            client: Client::new(),
            embedder,
        }
    }

    fn collection_url(&self, suffix: &str) -> Result<url::Url, SearchError> {
        let path = format!("collections/{}{}", self.collection, suffix);
        Ok(endpoint_url(&self.endpoint, &path)?)
    }

    fn collection_exists(&self) -> Result<bool, SearchError> {
        let response = self.client.get(self.collection_url("")?).send()?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(backend_error(status)),
        }
    }

    pub fn ensure_collection(&self, vector_size: usize) -> Result<(), SearchError> {
        if self.collection_exists()? {
            return Ok(());
        }

        let response = self
            .client
            .put(self.collection_url("")?)
            .json(&json!({
                "vectors": { "size": vector_size, "distance": "Cosine" },
            }))
            .send()?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }
        info!(collection = %self.collection, vector_size, "created qdrant collection");
        Ok(())
    }

    /// Reads the embedding identity recorded on one stored point, if any.
    fn stored_embedding_id(&self) -> Result<Option<String>, SearchError> {
        let response = self
            .client
            .post(self.collection_url("/points/scroll")?)
            .json(&json!({
                "limit": 1,
                "with_payload": ["embedding_id"],
                "with_vector": false,
            }))
            .send()?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        let parsed: Value = response.json()?;
        Ok(sampled_embedding_id(&parsed))
    }

    /// Refuses to mix vectors from a different embedder into an existing collection.
    fn check_embedding_identity(&self) -> Result<(), SearchError> {
        let stored = self.stored_embedding_id()?;
        ensure_same_embedding(stored.as_deref(), &self.embedder.embedding_id())
    }
}

impl<E: Embedder> VectorIndex for QdrantStore<E> {
    fn add(&mut self, chunks: &[DocumentChunk]) -> Result<(), SearchError> {
        if chunks.is_empty() {
            return Ok(());
        }
        if self.collection_exists()? {
            self.check_embedding_identity()?;
        }

        let embeddings = chunks
            .iter()
            .map(|chunk| self.embedder.embed(&chunk.text))
            .collect::<Result<Vec<_>, _>>()?;

        let Some(vector_size) = embeddings.first().map(Vec::len) else {
            return Ok(());
        };
        self.ensure_collection(vector_size)?;

        let embedding_id = self.embedder.embedding_id();
        let points = chunks
            .iter()
            .zip(embeddings.iter())
            .map(|(chunk, embedding)| {
                if embedding.len() != vector_size {
                    return Err(SearchError::Request(format!(
                        "embedding dimension {} != {}",
                        embedding.len(),
                        vector_size
                    )));
                }

                Ok(json!({
                    "id": point_id(&chunk.chunk_id),
                    "vector": embedding,
                    "payload": {
                        "chunk_id": chunk.chunk_id,
                        "source": chunk.source,
                        "page": chunk.page,
                        "text": chunk.text,
                        "embedding_id": embedding_id,
                    },
                }))
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        let response = self
            .client
            .put(self.collection_url("/points?wait=true")?)
            .json(&json!({ "points": points }))
            .send()?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        Ok(())
    }

    fn search(
        &self,
        query: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<RetrievedMatch>, SearchError> {
        if k == 0 || !self.collection_exists()? {
            return Ok(Vec::new());
        }
        self.check_embedding_identity()?;

        let query_vector = self.embedder.embed(query)?;
        let response = self
            .client
            .post(self.collection_url("/points/search")?)
            .json(&search_body(&query_vector, k, filter))
            .send()?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        let parsed: Value = response.json()?;
        Ok(parse_search_hits(&parsed))
    }
}

fn backend_error(status: StatusCode) -> SearchError {
    SearchError::BackendResponse {
        backend: "qdrant".to_string(),
        details: status.to_string(),
    }
}

/// Qdrant ids must be integers or UUIDs; derive a stable integer from the chunk id.
fn point_id(chunk_id: &str) -> u64 {
    let digest = Sha256::digest(chunk_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn sampled_embedding_id(parsed: &Value) -> Option<String> {
    parsed
        .pointer("/result/points/0/payload/embedding_id")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Points written before identities were recorded carry none and are accepted.
fn ensure_same_embedding(stored: Option<&str>, configured: &str) -> Result<(), SearchError> {
    match stored {
        Some(stored) if stored != configured => Err(SearchError::EmbeddingMismatch {
            expected: stored.to_string(),
            found: configured.to_string(),
        }),
        _ => Ok(()),
    }
}

fn search_body(query_vector: &[f32], k: usize, filter: &SearchFilter) -> Value {
    let mut body = json!({
        "vector": query_vector,
        "limit": k,
        "with_payload": true,
    });
    if let Some(source) = &filter.source {
        body["filter"] = json!({
            "must": [{ "key": "source", "match": { "value": source } }],
        });
    }
    body
}

fn parse_search_hits(parsed: &Value) -> Vec<RetrievedMatch> {
    let hits = parsed
        .pointer("/result")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    hits.iter()
        .enumerate()
        .map(|(position, hit)| RetrievedMatch {
            rank: position + 1,
            score: hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0) as f32,
            text: hit
                .pointer("/payload/text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            source: hit
                .pointer("/payload/source")
                .and_then(Value::as_str)
                .map(str::to_string),
            page: hit
                .pointer("/payload/page")
                .and_then(Value::as_u64)
                .map(|page| page as u32),
        })
        .collect()
}
