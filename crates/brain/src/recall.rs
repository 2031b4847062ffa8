//! Context Recall: the user's earlier questions, found again by meaning.
//!
//! Writes compose one document per exchange, embed it, and upsert it into the
//! user's partition. Reads are best-effort: any store or embedding failure
//! becomes an empty result.

use crate::truncate_chars;
use doki_config::RecallConfig;
use doki_core::error::MemoryError;
use doki_core::knowledge::{Embedder, KnowledgeEntry, KnowledgeMetadata, KnowledgeStore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Results at or below this similarity are dropped.
pub const RELEVANCE_FLOOR: f32 = 0.3;

/// A recalled exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallResult {
    pub document: String,
    pub metadata: KnowledgeMetadata,
    /// `1 - cosine distance`, always above [`RELEVANCE_FLOOR`]
    pub similarity: f32,
}

/// Entry counts for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSummary {
    pub total_entries: usize,
    pub subjects: BTreeMap<String, usize>,
}

/// Truncation limits for stored documents.
#[derive(Debug, Clone, PartialEq)]
pub struct RecallPolicy {
    pub answer_chars: usize,
    pub question_chars: usize,
}

impl Default for RecallPolicy {
    fn default() -> Self {
        Self::from_config(&RecallConfig::default())
    }
}

impl RecallPolicy {
    pub fn from_config(config: &RecallConfig) -> Self {
        Self {
            answer_chars: config.answer_chars,
            question_chars: config.question_chars,
        }
    }
}

pub struct ContextRecall {
    store: Arc<dyn KnowledgeStore>,
    embedder: Arc<dyn Embedder>,
    policy: RecallPolicy,
}

impl ContextRecall {
    pub fn new(store: Arc<dyn KnowledgeStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            policy: RecallPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RecallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Store one question/answer exchange.
    ///
    /// Without an `entry_id` the key is derived from the question, so asking
    /// the same question again overwrites the earlier entry.
    pub async fn remember(
        &self,
        user_id: &str,
        question: &str,
        answer: &str,
        subject: &str,
        topic: Option<&str>,
        entry_id: Option<&str>,
    ) -> Result<(), MemoryError> {
        let document = compose_document(subject, question, answer, self.policy.answer_chars);
        let embedding = self.embedder.embed(&document).await?;
        let entry_id = entry_id
            .map(String::from)
            .unwrap_or_else(|| fallback_entry_id(question));

        let entry = KnowledgeEntry {
            entry_id,
            document,
            embedding,
            metadata: KnowledgeMetadata {
                subject: subject.to_string(),
                topic: topic.filter(|t| !t.is_empty()).map(String::from),
                question: truncate_chars(question, self.policy.question_chars).to_string(),
                user_id: user_id.to_string(),
            },
        };
        debug!(user_id, subject, entry_id = %entry.entry_id, "Remembering exchange");
        self.store.upsert(user_id, entry).await
    }

    /// Up to `limit` earlier exchanges similar to `query`, most similar first.
    pub async fn recall(
        &self,
        user_id: &str,
        query: &str,
        subject: Option<&str>,
        limit: usize,
    ) -> Vec<RecallResult> {
        match self.try_recall(user_id, query, subject, limit).await {
            Ok(results) => results,
            Err(e) => {
                warn!(user_id, "Recall failed, continuing without history: {e}");
                Vec::new()
            }
        }
    }

    async fn try_recall(
        &self,
        user_id: &str,
        query: &str,
        subject: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RecallResult>, MemoryError> {
        let size = self.store.count(user_id).await?;
        let k = limit.min(size);
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;
        let neighbors = self.store.nearest(user_id, &embedding, k, subject).await?;

        let mut results: Vec<RecallResult> = neighbors
            .into_iter()
            .map(|n| RecallResult {
                similarity: 1.0 - n.distance,
                document: n.document,
                metadata: n.metadata,
            })
            .filter(|r| r.similarity > RELEVANCE_FLOOR)
            .collect();
        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

        debug!(user_id, requested = k, kept = results.len(), "Recall finished");
        Ok(results)
    }

    /// How many entries the user has, per subject.
    pub async fn knowledge_summary(&self, user_id: &str) -> KnowledgeSummary {
        let metadata = match self.store.metadata(user_id).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(user_id, "Knowledge summary unavailable: {e}");
                return KnowledgeSummary::default();
            }
        };

        let mut subjects = BTreeMap::new();
        for meta in &metadata {
            *subjects.entry(meta.subject.clone()).or_insert(0) += 1;
        }
        KnowledgeSummary {
            total_entries: metadata.len(),
            subjects,
        }
    }
}

/// The stored text of one exchange: subject tag, question, truncated answer.
pub fn compose_document(subject: &str, question: &str, answer: &str, answer_chars: usize) -> String {
    format!(
        "[{}] Pergunta: {}\nResposta: {}",
        subject.to_uppercase(),
        question,
        truncate_chars(answer, answer_chars)
    )
}

/// Deterministic key for an exchange stored without an explicit id.
pub fn fallback_entry_id(question: &str) -> String {
    let digest = Sha256::digest(question.as_bytes());
    format!("q_{}", hex::encode(&digest[..8]))
}
