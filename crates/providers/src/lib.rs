//! Language-model backends for Doki.
//!
//! All backends implement the `doki_core::Provider` trait.
//! `build_from_config` picks one based on the `[llm]` section.

mod http;
pub mod embedder;
pub mod ollama;
pub mod openai_compat;
pub mod router;
pub mod unconfigured;

pub use embedder::ProviderEmbedder;
pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_embedder, build_from_config};
pub use unconfigured::UnconfiguredProvider;
