//! Wiring shared by the commands that need the full pipeline.

use doki_brain::Brain;
use doki_config::AppConfig;
use doki_core::knowledge::KnowledgeStore;
use doki_core::mastery::MasteryStore;
use doki_memory::{InMemoryKnowledgeStore, InMemoryMasteryStore, SqliteStore};
use std::sync::Arc;
use tracing::{info, warn};

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Mastery and knowledge stores for the configured backend.
pub async fn open_stores(
    config: &AppConfig,
) -> Result<(Arc<dyn MasteryStore>, Arc<dyn KnowledgeStore>), Box<dyn std::error::Error>> {
    match config.storage.backend.as_str() {
        "memory" => {
            info!("Using in-memory stores; nothing will persist");
            let mastery: Arc<dyn MasteryStore> = Arc::new(InMemoryMasteryStore::new());
            let knowledge: Arc<dyn KnowledgeStore> = Arc::new(InMemoryKnowledgeStore::new());
            Ok((mastery, knowledge))
        }
        other => {
            if other != "sqlite" {
                warn!("Unknown storage backend '{other}', falling back to sqlite");
            }
            let store = Arc::new(SqliteStore::open(&config.storage.sqlite_path()).await?);
            let mastery: Arc<dyn MasteryStore> = store.clone();
            let knowledge: Arc<dyn KnowledgeStore> = store;
            Ok((mastery, knowledge))
        }
    }
}

pub async fn build_brain(config: &AppConfig) -> Result<Brain, Box<dyn std::error::Error>> {
    let (mastery, knowledge) = open_stores(config).await?;
    let embedder = doki_providers::build_embedder(config)?;
    let provider = doki_providers::build_from_config(&config.llm)?;
    Ok(Brain::from_config(config, mastery, knowledge, embedder, provider)?)
}
