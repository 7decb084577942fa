use super::{ChatMessage, LanguageModel, ModelReply};
use crate::error::LlmError;
use crate::http::endpoint_url;
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Clone, Serialize)]
struct ChatOptions {
    temperature: f32,
}

/// Chat completions from a local Ollama daemon.
pub struct OllamaChat {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaChat {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

impl LanguageModel for OllamaChat {
    fn complete(&self, messages: &[ChatMessage]) -> Result<ModelReply, LlmError> {
        let url = endpoint_url(&self.base_url, "api/chat")?;
        debug!(model = %self.model, messages = messages.len(), "ollama chat request");

        let response = self
            .client
            .post(url)
            .json(&ChatRequest {
                model: &self.model,
                messages,
                stream: false,
                options: ChatOptions { temperature: 0.0 },
            })
            .send()?;

        if !response.status().is_success() {
            return Err(LlmError::BackendResponse {
                backend: "ollama".to_string(),
                details: format!("chat request returned {}", response.status()),
            });
        }

        let raw: Value = response.json()?;
        Ok(parse_reply(raw))
    }
}

fn parse_reply(raw: Value) -> ModelReply {
    let content = raw
        .pointer("/message/content")
        .and_then(Value::as_str)
        .map(str::to_string);
    ModelReply { content, raw }
}
