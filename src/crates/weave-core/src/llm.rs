//! Chat-model contract implemented by provider crates.
//!
//! The engine only depends on this trait; concrete providers (remote
//! OpenAI-compatible APIs, the deterministic offline model) live in
//! `weave-llm`. Speech synthesis and transcription are optional
//! capabilities with erroring defaults.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("request failed: {0}")]
    Http(String),

    #[error("{0} is not supported by this model")]
    Unsupported(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub model: String,
    pub voice: String,
    pub format: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct TranscribeRequest {
    pub model: String,
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub prompt: Option<String>,
    pub language: Option<String>,
}

/// A chat completion provider.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;

    /// Synthesize speech for the given text; returns raw audio bytes.
    async fn speech(&self, _request: SpeechRequest) -> Result<Vec<u8>, LlmError> {
        Err(LlmError::Unsupported("speech"))
    }

    /// Transcribe audio bytes to text.
    async fn transcribe(&self, _request: TranscribeRequest) -> Result<String, LlmError> {
        Err(LlmError::Unsupported("transcription"))
    }
}
