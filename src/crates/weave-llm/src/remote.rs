//! OpenAI-compatible API client.
//!
//! Covers the three endpoints the block library uses: chat
//! completions, speech synthesis and audio transcription. Any provider
//! exposing the OpenAI wire shape works by pointing `base_url`
//! elsewhere.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use weave_core::llm::{
    ChatModel, ChatRequest, ChatResponse, LlmError, SpeechRequest, TranscribeRequest,
};

use crate::config::RemoteLlmConfig;

#[derive(Clone)]
pub struct OpenAiClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl OpenAiClient {
    pub fn new(config: RemoteLlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn map_failure(status: reqwest::StatusCode, body: String) -> LlmError {
        match status.as_u16() {
            401 => LlmError::Authentication(body),
            429 => LlmError::RateLimit(body),
            _ => LlmError::Provider(format!("API error {status}: {body}")),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Self::map_failure(status, body))
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = OpenAiChatRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages: request
                .messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        let response = Self::check(response).await?;

        let parsed: OpenAiChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        let text = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        Ok(ChatResponse { text })
    }

    async fn speech(&self, request: SpeechRequest) -> Result<Vec<u8>, LlmError> {
        let url = format!("{}/audio/speech", self.config.base_url);
        let body = OpenAiSpeechRequest {
            model: request.model,
            voice: request.voice,
            input: request.text,
            response_format: request.format,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        let response = Self::check(response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn transcribe(&self, request: TranscribeRequest) -> Result<String, LlmError> {
        let url = format!("{}/audio/transcriptions", self.config.base_url);

        let part = reqwest::multipart::Part::bytes(request.bytes)
            .file_name(request.filename)
            .mime_str(&request.mime)
            .map_err(|e| LlmError::Http(e.to_string()))?;
        let mut form = reqwest::multipart::Form::new()
            .text("model", request.model)
            .part("file", part);
        if let Some(prompt) = request.prompt {
            form = form.text("prompt", prompt);
        }
        if let Some(language) = request.language {
            form = form.text("language", language);
        }

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        let response = Self::check(response).await?;

        let parsed: OpenAiTranscription = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        Ok(parsed.text)
    }
}

#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiSpeechRequest {
    model: String,
    voice: String,
    input: String,
    response_format: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiTranscription {
    text: String,
}
