//! # Doki Core
//!
//! Domain types, traits, and error definitions for the Doki study assistant.
//! This crate has **zero framework dependencies**: it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator of the decision pipeline is a trait here:
//! - [`Provider`] generates text (and, optionally, embeddings)
//! - [`Embedder`] turns text into fixed-length vectors
//! - [`MasteryStore`] persists per-(user, subject) mastery records
//! - [`KnowledgeStore`] is the per-user vector collection used for recall
//!
//! Implementations live in their respective crates, so tests can swap in
//! in-memory stores and scripted providers.

pub mod error;
pub mod knowledge;
pub mod mastery;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{MemoryError, ProviderError};
pub use knowledge::{Embedder, KnowledgeEntry, KnowledgeMetadata, KnowledgeStore, Neighbor};
pub use mastery::{MasteryRecord, MasteryStore, ScoreUpdate};
pub use message::{Role, Turn};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
