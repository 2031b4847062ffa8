//! Config-driven construction of the generation backend and the embedder.

use crate::embedder::ProviderEmbedder;
use crate::ollama::OllamaProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::unconfigured::UnconfiguredProvider;
use doki_config::{AppConfig, LlmConfig};
use doki_core::error::ProviderError;
use doki_core::knowledge::Embedder;
use doki_core::provider::Provider;
use doki_memory::HashEmbedder;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Build the backend named by `llm.backend`.
///
/// Unknown names fall back to [`UnconfiguredProvider`], which answers with
/// setup instructions instead of failing every message.
pub fn build_from_config(config: &LlmConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let provider: Arc<dyn Provider> = match config.backend.as_str() {
        "ollama" => Arc::new(OllamaProvider::new(&config.base_url, timeout)?),
        "openai_compatible" => Arc::new(OpenAiCompatProvider::new(
            "openai_compatible",
            &config.base_url,
            config.api_key.clone(),
            timeout,
        )?),
        "none" | "" => Arc::new(UnconfiguredProvider),
        other => {
            warn!(backend = other, "Unknown llm.backend, language engine disabled");
            Arc::new(UnconfiguredProvider)
        }
    };

    info!(backend = provider.name(), model = %config.model, "Language backend ready");
    Ok(provider)
}

/// Build the embedder named by `embedding.backend`.
pub fn build_embedder(config: &AppConfig) -> Result<Arc<dyn Embedder>, ProviderError> {
    let embedding = &config.embedding;
    match embedding.backend.as_str() {
        "hash" => Ok(Arc::new(HashEmbedder::new(embedding.dimensions))),
        "provider" => {
            let timeout = Duration::from_secs(config.llm.timeout_secs);
            let provider: Arc<dyn Provider> = match config.llm.backend.as_str() {
                "ollama" => Arc::new(OllamaProvider::new(&config.llm.base_url, timeout)?),
                "openai_compatible" => Arc::new(OpenAiCompatProvider::new(
                    "openai_compatible",
                    &config.llm.base_url,
                    config.llm.api_key.clone(),
                    timeout,
                )?),
                other => {
                    return Err(ProviderError::NotConfigured(format!(
                        "embedding.backend = \"provider\" needs an ollama or openai_compatible llm backend, got '{other}'"
                    )));
                }
            };
            Ok(Arc::new(ProviderEmbedder::new(
                provider,
                &embedding.model,
                embedding.dimensions,
            )))
        }
        other => Err(ProviderError::NotConfigured(format!(
            "Unknown embedding backend '{other}' (expected \"hash\" or \"provider\")"
        ))),
    }
}
