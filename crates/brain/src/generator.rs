//! Response generation with a hard timeout.
//!
//! [`ResponseGenerator::generate`] never fails. Transport problems and
//! timeouts come back as a short apology so the caller can still finish its
//! conversation bookkeeping.

use doki_config::LlmConfig;
use doki_core::error::ProviderError;
use doki_core::message::Turn;
use doki_core::provider::{Provider, ProviderRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Reply used for any failure other than an unreachable backend.
pub const INTERNAL_ERROR_REPLY: &str = "⚠️ Ocorreu um erro interno. Por favor, tente novamente.";

/// Result of probing the configured backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub backend: String,
    pub model: String,
    pub reachable: bool,
    /// Whether `model` appears in `available_models`
    pub model_installed: bool,
    pub available_models: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct ResponseGenerator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
    /// Sum of `total_tokens` over every reply that reported usage
    tokens_used: AtomicU64,
}

impl ResponseGenerator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.3,
            max_tokens: Some(2048),
            timeout: Duration::from_secs(120),
            tokens_used: AtomicU64::new(0),
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &LlmConfig) -> Self {
        Self::new(provider, config.model.clone())
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_timeout(Duration::from_secs(config.timeout_secs))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn backend(&self) -> &str {
        self.provider.name()
    }

    pub fn tokens_used(&self) -> u64 {
        self.tokens_used.load(Ordering::Relaxed)
    }

    /// Send `messages` (system turn first) and return the reply text.
    pub async fn generate(&self, messages: Vec<Turn>) -> String {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let outcome = tokio::time::timeout(self.timeout, self.provider.complete(request)).await;
        match outcome {
            Ok(Ok(response)) => {
                let (prompt_tokens, completion_tokens) = match &response.usage {
                    Some(usage) => {
                        self.tokens_used
                            .fetch_add(u64::from(usage.total_tokens), Ordering::Relaxed);
                        (usage.prompt_tokens, usage.completion_tokens)
                    }
                    None => (0, 0),
                };
                debug!(
                    backend = self.provider.name(),
                    model = %response.model,
                    chars = response.content.len(),
                    prompt_tokens,
                    completion_tokens,
                    "Generation finished"
                );
                response.content
            }
            Ok(Err(e)) => {
                warn!(backend = self.provider.name(), model = %self.model, "Generation failed: {e}");
                self.apology(&e)
            }
            Err(_) => {
                warn!(
                    backend = self.provider.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "Generation timed out"
                );
                INTERNAL_ERROR_REPLY.to_string()
            }
        }
    }

    /// Probe the backend and list its models.
    pub async fn health(&self) -> HealthReport {
        let mut report = HealthReport {
            backend: self.provider.name().to_string(),
            model: self.model.clone(),
            reachable: false,
            model_installed: false,
            available_models: Vec::new(),
            error: None,
        };

        match self.provider.health_check().await {
            Ok(reachable) => report.reachable = reachable,
            Err(e) => {
                report.error = Some(e.to_string());
                return report;
            }
        }
        if !report.reachable {
            return report;
        }

        match self.provider.list_models().await {
            Ok(models) => {
                report.model_installed = models
                    .iter()
                    .any(|m| m == &self.model || m.split(':').next() == Some(self.model.as_str()));
                report.available_models = models;
            }
            Err(e) => report.error = Some(e.to_string()),
        }
        report
    }

    fn apology(&self, error: &ProviderError) -> String {
        let model = &self.model;
        match error {
            ProviderError::Network(_) if self.provider.name() == "ollama" => format!(
                "⚠️ O motor de linguagem da Doki não está disponível no momento. \
                 Por favor, certifique-se que o Ollama está rodando com `ollama serve` \
                 e que o modelo `{model}` está instalado com `ollama pull {model}`."
            ),
            ProviderError::Network(_) => format!(
                "⚠️ O motor de linguagem da Doki não está disponível no momento. \
                 Verifique se o servidor configurado está acessível e se o modelo `{model}` está disponível."
            ),
            _ => INTERNAL_ERROR_REPLY.to_string(),
        }
    }
}
