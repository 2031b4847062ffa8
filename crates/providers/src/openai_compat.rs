//! OpenAI-compatible backend.
//!
//! Works with LM Studio, vLLM, llama.cpp server, Groq, Together AI and any
//! endpoint exposing `/v1/chat/completions`. Embeddings go through
//! `/v1/embeddings` when the server offers them.

use crate::http;
use async_trait::async_trait;
use doki_core::error::ProviderError;
use doki_core::provider::*;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub struct OpenAiCompatProvider {
    name: String,
    /// Root URL without the `/v1` suffix
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// `base_url` may be given with or without a trailing `/v1`.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/');
        let base_url = base_url.strip_suffix("/v1").unwrap_or(base_url).to_string();

        Ok(Self {
            name: name.into(),
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()),
            client: http::client(timeout)?,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.base_url)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn chat_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self
            .authorized(self.client.post(self.endpoint("chat/completions")))
            .json(&Self::chat_body(&request))
            .send()
            .await
            .map_err(http::transport_error)?;
        let response = http::check_status(&self.name, response).await?;

        let api_response: ApiResponse = response.json().await.map_err(http::parse_error)?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            model: api_response.model.unwrap_or(request.model),
            usage,
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        debug!(
            provider = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
            "encoding_format": "float",
        });

        let response = self
            .authorized(self.client.post(self.endpoint("embeddings")))
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;
        let response = http::check_status(&self.name, response).await?;

        let mut api_resp: EmbeddingApiResponse =
            response.json().await.map_err(http::parse_error)?;
        api_resp.data.sort_by_key(|d| d.index);

        Ok(EmbeddingResponse {
            embeddings: api_resp.data.into_iter().map(|d| d.embedding).collect(),
            model: api_resp.model.unwrap_or(request.model),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .authorized(self.client.get(self.endpoint("models")))
            .send()
            .await
            .map_err(http::transport_error)?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let body: serde_json::Value = response.json().await.map_err(http::parse_error)?;
        let models = body["data"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let response = self
            .authorized(self.client.get(self.endpoint("models")))
            .send()
            .await
            .map_err(http::transport_error)?;
        Ok(response.status().is_success())
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    model: Option<String>,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct EmbeddingApiResponse {
    model: Option<String>,
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}
