//! Knowledge entries: the per-user vector collection behind context recall.
//!
//! Each user owns an isolated partition. Entries are upserted by id, so
//! writing the same id twice overwrites. Similarity search uses cosine
//! distance (`1 - cosine_similarity`).

use crate::error::MemoryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata stored alongside every entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeMetadata {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// The question, truncated
    pub question: String,
    pub user_id: String,
}

/// A stored question/answer document with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub entry_id: String,
    pub document: String,
    pub embedding: Vec<f32>,
    pub metadata: KnowledgeMetadata,
}

/// A nearest-neighbour hit as returned by a store.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub entry_id: String,
    pub document: String,
    pub metadata: KnowledgeMetadata,
    /// Cosine distance in `[0, 2]`
    pub distance: f32,
}

/// A per-user vector collection.
///
/// Implementations: in-memory and SQLite.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Insert or overwrite an entry in the user's partition.
    async fn upsert(&self, user_id: &str, entry: KnowledgeEntry) -> Result<(), MemoryError>;

    /// Number of entries in the user's partition.
    async fn count(&self, user_id: &str) -> Result<usize, MemoryError>;

    /// The `k` entries closest to `query`, nearest first, optionally
    /// restricted to entries whose subject equals `subject`.
    async fn nearest(
        &self,
        user_id: &str,
        query: &[f32],
        k: usize,
        subject: Option<&str>,
    ) -> Result<Vec<Neighbor>, MemoryError>;

    /// Metadata of every entry in the user's partition.
    async fn metadata(&self, user_id: &str) -> Result<Vec<KnowledgeMetadata>, MemoryError>;

    /// Drop the user's partition. Returns how many entries were removed.
    async fn delete_user(&self, user_id: &str) -> Result<usize, MemoryError>;
}

/// Text → fixed-length vector.
///
/// Must be deterministic for identical input and keep the same
/// dimensionality across calls.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;
}
