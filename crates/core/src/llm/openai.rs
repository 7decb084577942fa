use super::{ChatMessage, LanguageModel, ModelReply};
use crate::error::LlmError;
use crate::http::endpoint_url;
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

/// OpenAI-compatible `chat/completions` endpoint.
pub struct OpenAiChat {
    base_url: String,
    model: String,
    api_key: String,
    client: Client,
}

impl OpenAiChat {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

impl LanguageModel for OpenAiChat {
    fn complete(&self, messages: &[ChatMessage]) -> Result<ModelReply, LlmError> {
        let url = endpoint_url(&self.base_url, "chat/completions")?;
        debug!(model = %self.model, messages = messages.len(), "openai chat request");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model: &self.model,
                messages,
                temperature: 0.0,
            })
            .send()?;

        if !response.status().is_success() {
            return Err(LlmError::BackendResponse {
                backend: "openai".to_string(),
                details: format!("chat completion returned {}", response.status()),
            });
        }

        let raw: Value = response.json()?;
        Ok(parse_reply(raw))
    }
}

fn parse_reply(raw: Value) -> ModelReply {
    let content = raw
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string);
    ModelReply { content, raw }
}
