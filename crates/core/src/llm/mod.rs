use crate::error::LlmError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub mod ollama;
pub mod openai;

pub use ollama::OllamaChat;
pub use openai::OpenAiChat;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// What a provider sent back: the answer text when the reply carried one,
/// and the decoded reply body either way.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub content: Option<String>,
    pub raw: Value,
}

impl ModelReply {
    pub fn text(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            raw: Value::String(content.clone()),
            content: Some(content),
        }
    }

    pub fn into_text(self) -> String {
        match self.content {
            Some(content) => content,
            None => self.raw.to_string(),
        }
    }
}

pub trait LanguageModel {
    fn complete(&self, messages: &[ChatMessage]) -> Result<ModelReply, LlmError>;
}

impl<L: LanguageModel + ?Sized> LanguageModel for Box<L> {
    fn complete(&self, messages: &[ChatMessage]) -> Result<ModelReply, LlmError> {
        (**self).complete(messages)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Ollama,
    OpenAi,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = LlmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => Err(LlmError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub provider: Provider,
    /// Overrides the provider's default model when set.
    pub model: Option<String>,
    pub ollama_model: String,
    pub openai_model: String,
    pub ollama_base_url: String,
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            model: None,
            ollama_model: "llama3.1:8b".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_api_key: None,
        }
    }
}

impl LlmConfig {
    pub fn model_name(&self) -> &str {
        if let Some(model) = &self.model {
            return model;
        }
        match self.provider {
            Provider::Ollama => &self.ollama_model,
            Provider::OpenAi => &self.openai_model,
        }
    }
}

pub fn build_language_model(config: &LlmConfig) -> Result<Box<dyn LanguageModel>, LlmError> {
    let model = config.model_name().to_string();
    match config.provider {
        Provider::Ollama => Ok(Box::new(OllamaChat::new(&config.ollama_base_url, model))),
        Provider::OpenAi => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or_else(|| LlmError::MissingApiKey(Provider::OpenAi.to_string()))?;
            Ok(Box::new(OpenAiChat::new(
                &config.openai_base_url,
                model,
                api_key,
            )))
        }
    }
}
