//! Storage backends for Doki.
//!
//! - mastery records (`MasteryStore`) and per-user knowledge entries
//!   (`KnowledgeStore`), in memory or in SQLite
//! - brute-force cosine ranking shared by both backends
//! - a local, deterministic hashing embedder

pub mod embedder;
pub mod in_memory;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use embedder::HashEmbedder;
pub use in_memory::{InMemoryKnowledgeStore, InMemoryMasteryStore};
pub use vector::{cosine_distance, cosine_similarity, nearest_neighbors};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
