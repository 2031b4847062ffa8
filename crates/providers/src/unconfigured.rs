//! Placeholder backend used when `llm.backend` names nothing usable.

use async_trait::async_trait;
use doki_core::error::ProviderError;
use doki_core::provider::{Provider, ProviderRequest, ProviderResponse};

pub const SETUP_REPLY: &str = "🤖 Olá! Sou a Doki, mas meu motor de linguagem ainda não está configurado. \
    Defina `llm.backend` em ~/.doki/config.toml (ou a variável DOKI_LLM_BACKEND) para começarmos! \
    Opções: `ollama` (local, gratuito) ou `openai_compatible`.";

/// Answers every request with setup instructions.
#[derive(Debug, Default)]
pub struct UnconfiguredProvider;

#[async_trait]
impl Provider for UnconfiguredProvider {
    fn name(&self) -> &str {
        "none"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse {
            content: SETUP_REPLY.to_string(),
            model: request.model,
            usage: None,
        })
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doki_core::message::Turn;

    #[tokio::test]
    async fn replies_with_setup_instructions() {
        let reply = UnconfiguredProvider
            .complete(ProviderRequest {
                model: "mistral".into(),
                messages: vec![Turn::user("Oi")],
                temperature: 0.3,
                max_tokens: None,
            })
            .await
            .unwrap();
        assert_eq!(reply.content, SETUP_REPLY);
        assert!(!UnconfiguredProvider.health_check().await.unwrap());
    }
}
