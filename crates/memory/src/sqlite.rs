//! SQLite persistence for mastery records and knowledge entries.
//!
//! One database file, two tables:
//! - `mastery_records`: one row per `(user_id, subject)`, updated by a single
//!   `INSERT .. ON CONFLICT DO UPDATE .. RETURNING` statement so the
//!   increment-and-clamp is atomic
//! - `knowledge_entries`: keyed by `(user_id, entry_id)`, embeddings stored as
//!   little-endian f32 blobs and ranked with a cosine scan of the partition

use crate::vector;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use doki_core::error::MemoryError;
use doki_core::knowledge::{KnowledgeEntry, KnowledgeMetadata, KnowledgeStore, Neighbor};
use doki_core::mastery::{MasteryRecord, MasteryStore, ScoreUpdate};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Both stores over one SQLite pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run migrations.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database.
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?;
        let store = Self::connect(options).await?;
        info!("SQLite store initialized at {path}");
        Ok(store)
    }

    /// Open a database file, creating parent directories as needed.
    pub async fn open(path: &Path) -> Result<Self, MemoryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        let store = Self::connect(SqliteConnectOptions::new().filename(path)).await?;
        info!("SQLite store initialized at {}", path.display());
        Ok(store)
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self, MemoryError> {
        let options = options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, MemoryError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mastery_records (
                user_id           TEXT NOT NULL,
                subject           TEXT NOT NULL,
                score             REAL NOT NULL,
                interaction_count INTEGER NOT NULL,
                last_studied_at   TEXT NOT NULL,
                topic             TEXT,
                UNIQUE (user_id, subject)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("mastery_records table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS knowledge_entries (
                user_id    TEXT NOT NULL,
                entry_id   TEXT NOT NULL,
                document   TEXT NOT NULL,
                subject    TEXT NOT NULL,
                topic      TEXT,
                question   TEXT NOT NULL,
                embedding  BLOB NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, entry_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("knowledge_entries table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_knowledge_user_subject ON knowledge_entries(user_id, subject)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("knowledge index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_record(row: &SqliteRow) -> Result<MasteryRecord, MemoryError> {
        let column = |name: &str, e: sqlx::Error| MemoryError::QueryFailed(format!("{name} column: {e}"));

        let user_id: String = row.try_get("user_id").map_err(|e| column("user_id", e))?;
        let subject: String = row.try_get("subject").map_err(|e| column("subject", e))?;
        let score: f64 = row.try_get("score").map_err(|e| column("score", e))?;
        let count: i64 = row
            .try_get("interaction_count")
            .map_err(|e| column("interaction_count", e))?;
        let last_studied: String = row
            .try_get("last_studied_at")
            .map_err(|e| column("last_studied_at", e))?;
        let topic: Option<String> = row.try_get("topic").map_err(|e| column("topic", e))?;

        Ok(MasteryRecord {
            user_id,
            subject,
            score,
            interaction_count: u32::try_from(count).unwrap_or(u32::MAX),
            last_studied_at: parse_timestamp(&last_studied),
            topic,
        })
    }

    fn row_to_entry(row: &SqliteRow) -> Result<KnowledgeEntry, MemoryError> {
        let column = |name: &str, e: sqlx::Error| MemoryError::QueryFailed(format!("{name} column: {e}"));

        let user_id: String = row.try_get("user_id").map_err(|e| column("user_id", e))?;
        let entry_id: String = row.try_get("entry_id").map_err(|e| column("entry_id", e))?;
        let document: String = row.try_get("document").map_err(|e| column("document", e))?;
        let subject: String = row.try_get("subject").map_err(|e| column("subject", e))?;
        let topic: Option<String> = row.try_get("topic").map_err(|e| column("topic", e))?;
        let question: String = row.try_get("question").map_err(|e| column("question", e))?;
        let blob: Vec<u8> = row.try_get("embedding").map_err(|e| column("embedding", e))?;

        Ok(KnowledgeEntry {
            entry_id,
            document,
            embedding: blob_to_embedding(&blob),
            metadata: KnowledgeMetadata {
                subject,
                topic,
                question,
                user_id,
            },
        })
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[async_trait]
impl MasteryStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn record(
        &self,
        user_id: &str,
        subject: &str,
        update: ScoreUpdate,
    ) -> Result<MasteryRecord, MemoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO mastery_records (user_id, subject, score, interaction_count, last_studied_at, topic)
            VALUES (?1, ?2, MIN(?3, ?4), 1, ?5, ?6)
            ON CONFLICT(user_id, subject) DO UPDATE SET
                score = MIN(mastery_records.score + ?3, ?4),
                interaction_count = mastery_records.interaction_count + 1,
                last_studied_at = excluded.last_studied_at,
                topic = COALESCE(excluded.topic, mastery_records.topic)
            RETURNING user_id, subject, score, interaction_count, last_studied_at, topic
            "#,
        )
        .bind(user_id)
        .bind(subject)
        .bind(update.increment)
        .bind(update.max_score)
        .bind(update.at.to_rfc3339())
        .bind(update.topic())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("mastery upsert failed: {e}")))?;

        let record = Self::row_to_record(&row)?;
        debug!(user_id, subject, score = record.score, "Mastery updated");
        Ok(record)
    }

    async fn get(&self, user_id: &str, subject: &str) -> Result<Option<MasteryRecord>, MemoryError> {
        let row = sqlx::query("SELECT * FROM mastery_records WHERE user_id = ?1 AND subject = ?2")
            .bind(user_id)
            .bind(subject)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("mastery get: {e}")))?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn list(&self, user_id: &str) -> Result<Vec<MasteryRecord>, MemoryError> {
        let rows = sqlx::query(
            "SELECT * FROM mastery_records WHERE user_id = ?1 ORDER BY score DESC, subject ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("mastery list: {e}")))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn delete_user(&self, user_id: &str) -> Result<usize, MemoryError> {
        let result = sqlx::query("DELETE FROM mastery_records WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::Storage(format!("mastery delete: {e}")))?;
        Ok(result.rows_affected() as usize)
    }
}

#[async_trait]
impl KnowledgeStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn upsert(&self, user_id: &str, entry: KnowledgeEntry) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            INSERT INTO knowledge_entries (user_id, entry_id, document, subject, topic, question, embedding, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(user_id, entry_id) DO UPDATE SET
                document = excluded.document,
                subject = excluded.subject,
                topic = excluded.topic,
                question = excluded.question,
                embedding = excluded.embedding,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(&entry.entry_id)
        .bind(&entry.document)
        .bind(&entry.metadata.subject)
        .bind(&entry.metadata.topic)
        .bind(&entry.metadata.question)
        .bind(embedding_to_blob(&entry.embedding))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("knowledge upsert failed: {e}")))?;

        debug!(user_id, entry_id = %entry.entry_id, "Knowledge entry stored");
        Ok(())
    }

    async fn count(&self, user_id: &str) -> Result<usize, MemoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM knowledge_entries WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("knowledge count: {e}")))?;
        Ok(count as usize)
    }

    async fn nearest(
        &self,
        user_id: &str,
        query: &[f32],
        k: usize,
        subject: Option<&str>,
    ) -> Result<Vec<Neighbor>, MemoryError> {
        let rows = match subject {
            Some(subject) => {
                sqlx::query("SELECT * FROM knowledge_entries WHERE user_id = ?1 AND subject = ?2")
                    .bind(user_id)
                    .bind(subject)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM knowledge_entries WHERE user_id = ?1")
                    .bind(user_id)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| MemoryError::QueryFailed(format!("knowledge scan: {e}")))?;

        let entries = rows
            .iter()
            .map(Self::row_to_entry)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(vector::nearest_neighbors(&entries, query, k, subject))
    }

    async fn metadata(&self, user_id: &str) -> Result<Vec<KnowledgeMetadata>, MemoryError> {
        let rows = sqlx::query(
            "SELECT user_id, subject, topic, question FROM knowledge_entries WHERE user_id = ?1 ORDER BY entry_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("knowledge metadata: {e}")))?;

        rows.iter()
            .map(|row| -> Result<KnowledgeMetadata, MemoryError> {
                Ok(KnowledgeMetadata {
                    subject: row
                        .try_get("subject")
                        .map_err(|e| MemoryError::QueryFailed(format!("subject column: {e}")))?,
                    topic: row
                        .try_get("topic")
                        .map_err(|e| MemoryError::QueryFailed(format!("topic column: {e}")))?,
                    question: row
                        .try_get("question")
                        .map_err(|e| MemoryError::QueryFailed(format!("question column: {e}")))?,
                    user_id: row
                        .try_get("user_id")
                        .map_err(|e| MemoryError::QueryFailed(format!("user_id column: {e}")))?,
                })
            })
            .collect()
    }

    async fn delete_user(&self, user_id: &str) -> Result<usize, MemoryError> {
        let result = sqlx::query("DELETE FROM knowledge_entries WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::Storage(format!("knowledge delete: {e}")))?;
        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn test_store() -> (SqliteStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("doki.sqlite")).await.unwrap();
        (store, dir)
    }

    fn update(topic: Option<&str>) -> ScoreUpdate {
        ScoreUpdate {
            increment: 2.5,
            max_score: 100.0,
            topic: topic.map(String::from),
            at: Utc::now(),
        }
    }

    fn entry(id: &str, subject: &str, embedding: Vec<f32>) -> KnowledgeEntry {
        KnowledgeEntry {
            entry_id: id.into(),
            document: format!("[{}] Pergunta: {id}", subject.to_uppercase()),
            embedding,
            metadata: KnowledgeMetadata {
                subject: subject.into(),
                topic: Some("mecanica".into()),
                question: id.into(),
                user_id: "u1".into(),
            },
        }
    }

    #[tokio::test]
    async fn mastery_first_then_increment() {
        let (store, _dir) = test_store().await;
        let first = store.record("u1", "fisica", update(Some("optica"))).await.unwrap();
        assert_eq!(first.score, 2.5);
        assert_eq!(first.interaction_count, 1);
        assert_eq!(first.topic.as_deref(), Some("optica"));

        let second = store.record("u1", "fisica", update(Some(""))).await.unwrap();
        assert_eq!(second.score, 5.0);
        assert_eq!(second.interaction_count, 2);
        assert_eq!(second.topic.as_deref(), Some("optica"));
    }

    #[tokio::test]
    async fn mastery_clamps_at_max() {
        let (store, _dir) = test_store().await;
        for _ in 0..45 {
            store.record("u1", "quimica", update(None)).await.unwrap();
        }
        let record = store.get("u1", "quimica").await.unwrap().unwrap();
        assert_eq!(record.score, 100.0);
        assert_eq!(record.interaction_count, 45);
    }

    #[tokio::test]
    async fn concurrent_mastery_updates_do_not_lose_increments() {
        let (store, _dir) = test_store().await;
        let store = Arc::new(store);
        let mut handles = Vec::new();
        for _ in 0..12 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.record("u1", "historia", update(None)).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let record = store.get("u1", "historia").await.unwrap().unwrap();
        assert_eq!(record.interaction_count, 12);
        assert_eq!(record.score, 30.0);
    }

    #[tokio::test]
    async fn mastery_list_and_delete() {
        let (store, _dir) = test_store().await;
        store.record("u1", "fisica", update(None)).await.unwrap();
        store.record("u1", "historia", update(None)).await.unwrap();
        store.record("u1", "historia", update(None)).await.unwrap();
        store.record("u2", "fisica", update(None)).await.unwrap();

        let list = store.list("u1").await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].subject, "historia");

        assert_eq!(MasteryStore::delete_user(&store, "u1").await.unwrap(), 2);
        assert!(store.get("u1", "fisica").await.unwrap().is_none());
        assert!(store.get("u2", "fisica").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn knowledge_upsert_and_nearest() {
        let (store, _dir) = test_store().await;
        store.upsert("u1", entry("a", "fisica", vec![1.0, 0.0, 0.0])).await.unwrap();
        store.upsert("u1", entry("b", "fisica", vec![0.6, 0.8, 0.0])).await.unwrap();
        store.upsert("u1", entry("c", "quimica", vec![1.0, 0.0, 0.0])).await.unwrap();

        assert_eq!(store.count("u1").await.unwrap(), 3);

        let hits = store.nearest("u1", &[1.0, 0.0, 0.0], 2, Some("fisica")).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|n| n.entry_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(hits[0].distance.abs() < 1e-6);
        assert!((hits[1].distance - 0.4).abs() < 1e-5);
        assert_eq!(hits[0].metadata.topic.as_deref(), Some("mecanica"));
    }

    #[tokio::test]
    async fn knowledge_upsert_overwrites() {
        let (store, _dir) = test_store().await;
        store.upsert("u1", entry("a", "fisica", vec![1.0, 0.0])).await.unwrap();
        let mut newer = entry("a", "fisica", vec![0.0, 1.0]);
        newer.document = "newer".into();
        store.upsert("u1", newer).await.unwrap();

        assert_eq!(store.count("u1").await.unwrap(), 1);
        let hits = store.nearest("u1", &[0.0, 1.0], 1, None).await.unwrap();
        assert_eq!(hits[0].document, "newer");
    }

    #[tokio::test]
    async fn knowledge_partitions_metadata_and_delete() {
        let (store, _dir) = test_store().await;
        store.upsert("u1", entry("a", "fisica", vec![1.0])).await.unwrap();
        store.upsert("u2", entry("a", "historia", vec![1.0])).await.unwrap();

        let meta = store.metadata("u1").await.unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].subject, "fisica");

        assert_eq!(KnowledgeStore::delete_user(&store, "u1").await.unwrap(), 1);
        assert_eq!(store.count("u1").await.unwrap(), 0);
        assert_eq!(store.count("u2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doki.sqlite");
        {
            let store = SqliteStore::open(&path).await.unwrap();
            store.record("u1", "fisica", update(None)).await.unwrap();
            store.upsert("u1", entry("a", "fisica", vec![0.25, 0.5])).await.unwrap();
        }
        let store = SqliteStore::open(&path).await.unwrap();
        assert_eq!(store.get("u1", "fisica").await.unwrap().unwrap().interaction_count, 1);
        let hits = store.nearest("u1", &[0.25, 0.5], 1, None).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn blob_round_trip() {
        let v = vec![0.1f32, -2.5, 3.75];
        assert_eq!(blob_to_embedding(&embedding_to_blob(&v)), v);
    }

    #[tokio::test]
    async fn backend_name() {
        let (store, _dir) = test_store().await;
        assert_eq!(MasteryStore::name(&store), "sqlite");
    }
}
