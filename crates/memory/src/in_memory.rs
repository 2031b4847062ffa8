//! In-memory stores, useful for testing and ephemeral sessions.

use crate::vector;
use async_trait::async_trait;
use doki_core::error::MemoryError;
use doki_core::knowledge::{KnowledgeEntry, KnowledgeMetadata, KnowledgeStore, Neighbor};
use doki_core::mastery::{MasteryRecord, MasteryStore, ScoreUpdate};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Mastery records in a map keyed by `(user_id, subject)`.
///
/// `record` holds the write lock for the whole get-or-create-and-apply step,
/// so concurrent increments on the same key are serialized.
#[derive(Default)]
pub struct InMemoryMasteryStore {
    records: RwLock<HashMap<(String, String), MasteryRecord>>,
}

impl InMemoryMasteryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MasteryStore for InMemoryMasteryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn record(
        &self,
        user_id: &str,
        subject: &str,
        update: ScoreUpdate,
    ) -> Result<MasteryRecord, MemoryError> {
        let mut records = self.records.write().await;
        let record = records
            .entry((user_id.to_string(), subject.to_string()))
            .and_modify(|r| r.apply(&update))
            .or_insert_with(|| MasteryRecord::first(user_id, subject, &update));
        Ok(record.clone())
    }

    async fn get(&self, user_id: &str, subject: &str) -> Result<Option<MasteryRecord>, MemoryError> {
        let records = self.records.read().await;
        Ok(records.get(&(user_id.to_string(), subject.to_string())).cloned())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<MasteryRecord>, MemoryError> {
        let records = self.records.read().await;
        let mut mine: Vec<MasteryRecord> = records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.subject.cmp(&b.subject))
        });
        Ok(mine)
    }

    async fn delete_user(&self, user_id: &str) -> Result<usize, MemoryError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|(owner, _), _| owner != user_id);
        Ok(before - records.len())
    }
}

type Partition = Arc<RwLock<BTreeMap<String, KnowledgeEntry>>>;

/// Knowledge entries, one independently locked partition per user.
///
/// The outer lock is only held long enough to find or create a partition,
/// so writers for different users never wait on each other.
#[derive(Default)]
pub struct InMemoryKnowledgeStore {
    partitions: RwLock<HashMap<String, Partition>>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn partition(&self, user_id: &str) -> Option<Partition> {
        self.partitions.read().await.get(user_id).cloned()
    }

    async fn partition_or_create(&self, user_id: &str) -> Partition {
        if let Some(existing) = self.partition(user_id).await {
            return existing;
        }
        self.partitions
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn upsert(&self, user_id: &str, entry: KnowledgeEntry) -> Result<(), MemoryError> {
        let partition = self.partition_or_create(user_id).await;
        partition.write().await.insert(entry.entry_id.clone(), entry);
        Ok(())
    }

    async fn count(&self, user_id: &str) -> Result<usize, MemoryError> {
        match self.partition(user_id).await {
            Some(partition) => Ok(partition.read().await.len()),
            None => Ok(0),
        }
    }

    async fn nearest(
        &self,
        user_id: &str,
        query: &[f32],
        k: usize,
        subject: Option<&str>,
    ) -> Result<Vec<Neighbor>, MemoryError> {
        let Some(partition) = self.partition(user_id).await else {
            return Ok(Vec::new());
        };
        let entries = partition.read().await;
        Ok(vector::nearest_neighbors(entries.values(), query, k, subject))
    }

    async fn metadata(&self, user_id: &str) -> Result<Vec<KnowledgeMetadata>, MemoryError> {
        let Some(partition) = self.partition(user_id).await else {
            return Ok(Vec::new());
        };
        let entries = partition.read().await;
        Ok(entries.values().map(|e| e.metadata.clone()).collect())
    }

    async fn delete_user(&self, user_id: &str) -> Result<usize, MemoryError> {
        let removed = self.partitions.write().await.remove(user_id);
        match removed {
            Some(partition) => Ok(partition.read().await.len()),
            None => Ok(0),
        }
    }
}
