//! Native Ollama backend.
//!
//! Talks to a local `ollama serve`: `POST /api/chat` (non-streaming) for
//! replies, `POST /api/embed` for embeddings and `GET /api/tags` for the
//! installed models.

use crate::http;
use async_trait::async_trait;
use doki_core::error::ProviderError;
use doki_core::message::Turn;
use doki_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http::client(timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_body(request: &ProviderRequest) -> ChatRequest<'_> {
        ChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream: false,
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }

    async fn tags(&self) -> Result<TagsResponse, ProviderError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(http::transport_error)?;
        let response = http::check_status(self.name(), response).await?;
        response.json().await.map_err(http::parse_error)
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(model = %request.model, turns = request.messages.len(), "Sending Ollama chat request");

        let response = self
            .client
            .post(&url)
            .json(&Self::chat_body(&request))
            .send()
            .await
            .map_err(http::transport_error)?;
        let response = http::check_status(self.name(), response).await?;

        let body: ChatResponse = response.json().await.map_err(http::parse_error)?;
        let usage = match (body.prompt_eval_count, body.eval_count) {
            (Some(prompt), Some(completion)) => Some(Usage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }),
            _ => None,
        };

        Ok(ProviderResponse {
            content: body.message.content,
            model: body.model.unwrap_or(request.model),
            usage,
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "model": request.model, "input": request.inputs }))
            .send()
            .await
            .map_err(http::transport_error)?;
        let response = http::check_status(self.name(), response).await?;

        let body: EmbedResponse = response.json().await.map_err(http::parse_error)?;
        Ok(EmbeddingResponse {
            embeddings: body.embeddings,
            model: body.model.unwrap_or(request.model),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.tags().await?.models.into_iter().map(|m| m.name).collect())
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        self.tags().await?;
        Ok(true)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    model: Option<String>,
    message: ChatMessage,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    model: Option<String>,
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}
