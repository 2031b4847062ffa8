//! Mastery Tracker: per-(user, subject) scores and the instruction block
//! that tells the generator how advanced its answer should be.
//!
//! Scores are a saturating counter. Every interaction adds
//! [`MasteryPolicy::increment`], clamped at [`MasteryPolicy::max_score`].
//! There is no decay.

use chrono::{DateTime, Utc};
use doki_config::MasteryConfig;
use doki_core::error::MemoryError;
use doki_core::mastery::{MasteryRecord, MasteryStore, ScoreUpdate};
use doki_subjects::Taxonomy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Discrete level derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl MasteryLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
        }
    }

    /// Label shown to students.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Beginner => "iniciante",
            Self::Intermediate => "intermediário",
            Self::Advanced => "avançado",
            Self::Expert => "especialista",
        }
    }
}

impl std::fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scoring constants.
#[derive(Debug, Clone, PartialEq)]
pub struct MasteryPolicy {
    pub increment: f64,
    pub max_score: f64,
    pub intermediate_threshold: f64,
    pub advanced_threshold: f64,
    pub expert_threshold: f64,
}

impl Default for MasteryPolicy {
    fn default() -> Self {
        Self::from_config(&MasteryConfig::default())
    }
}

impl MasteryPolicy {
    pub fn from_config(config: &MasteryConfig) -> Self {
        Self {
            increment: config.increment,
            max_score: config.max_score,
            intermediate_threshold: config.intermediate_threshold,
            advanced_threshold: config.advanced_threshold,
            expert_threshold: config.expert_threshold,
        }
    }

    /// Step function over the score, lowest threshold checked first.
    pub fn level(&self, score: f64) -> MasteryLevel {
        if score < self.intermediate_threshold {
            MasteryLevel::Beginner
        } else if score < self.advanced_threshold {
            MasteryLevel::Intermediate
        } else if score < self.expert_threshold {
            MasteryLevel::Advanced
        } else {
            MasteryLevel::Expert
        }
    }

    fn update(&self, topic: Option<&str>) -> ScoreUpdate {
        ScoreUpdate {
            increment: self.increment,
            max_score: self.max_score,
            topic: topic.map(String::from),
            at: Utc::now(),
        }
    }
}

/// One row of a user's study profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub subject: String,
    pub display_name: String,
    pub icon: String,
    /// Rounded to one decimal
    pub score: f64,
    pub level: MasteryLevel,
    pub interaction_count: u32,
    pub last_studied_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

pub struct MasteryTracker {
    store: Arc<dyn MasteryStore>,
    policy: MasteryPolicy,
    taxonomy: &'static Taxonomy,
}

impl MasteryTracker {
    pub fn new(store: Arc<dyn MasteryStore>, policy: MasteryPolicy) -> Self {
        Self {
            store,
            policy,
            taxonomy: Taxonomy::builtin(),
        }
    }

    /// Use a different taxonomy for display names and icons.
    pub fn with_taxonomy(mut self, taxonomy: &'static Taxonomy) -> Self {
        self.taxonomy = taxonomy;
        self
    }

    pub fn policy(&self) -> &MasteryPolicy {
        &self.policy
    }

    pub fn level(&self, score: f64) -> MasteryLevel {
        self.policy.level(score)
    }

    /// Count one interaction. Get-or-create and increment happen atomically
    /// inside the store.
    pub async fn record_interaction(
        &self,
        user_id: &str,
        subject: &str,
        topic: Option<&str>,
    ) -> Result<MasteryRecord, MemoryError> {
        let record = self
            .store
            .record(user_id, subject, self.policy.update(topic))
            .await?;
        debug!(
            user_id,
            subject,
            score = record.score,
            interactions = record.interaction_count,
            "Mastery updated"
        );
        Ok(record)
    }

    /// Every subject the user has studied, highest score first.
    pub async fn profile(&self, user_id: &str) -> Result<Vec<ProfileEntry>, MemoryError> {
        let mut records = self.store.list(user_id).await?;
        records.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(records.into_iter().map(|r| self.entry(r)).collect())
    }

    /// Subject keys by score descending, at most `limit`.
    pub async fn top_subjects(&self, user_id: &str, limit: usize) -> Result<Vec<String>, MemoryError> {
        let profile = self.profile(user_id).await?;
        Ok(profile.into_iter().take(limit).map(|e| e.subject).collect())
    }

    /// The instruction block for this user and subject.
    ///
    /// Falls back to the new-learner text when no record exists or the
    /// store cannot be read.
    pub async fn context_block(&self, user_id: &str, subject: &str) -> String {
        let display = self.taxonomy.display_name(subject);
        let record = match self.store.get(user_id, subject).await {
            Ok(record) => record,
            Err(e) => {
                warn!(user_id, subject, "Mastery read failed, assuming new learner: {e}");
                None
            }
        };

        match record {
            Some(record) => self.render(&display, &record),
            None => new_learner_block(&display),
        }
    }

    fn render(&self, display: &str, record: &MasteryRecord) -> String {
        let count = record.interaction_count;
        let score = record.score;
        let max = self.policy.max_score;
        match self.policy.level(score) {
            MasteryLevel::Beginner => format!(
                "O usuário é INICIANTE em {display} ({count} interações, score {score:.0}/{max:.0}). \
                 Use linguagem simples, muitos exemplos práticos, evite jargões técnicos sem explicação. \
                 Incentive e mostre que o conteúdo é acessível."
            ),
            MasteryLevel::Intermediate => format!(
                "O usuário tem nível INTERMEDIÁRIO em {display} ({count} interações, score {score:.0}/{max:.0}). \
                 Pode usar terminologia técnica básica. Conecte novos conceitos com os que ele já viu antes. \
                 Inclua exemplos práticos e aplicações reais."
            ),
            MasteryLevel::Advanced => format!(
                "O usuário tem nível AVANÇADO em {display} ({count} interações, score {score:.0}/{max:.0}). \
                 Use terminologia técnica sem hesitação. Aprofunde nos detalhes. \
                 Mostre nuances, exceções e casos específicos. Pode usar fórmulas e demonstrações."
            ),
            MasteryLevel::Expert => format!(
                "O usuário é ESPECIALISTA em {display} ({count} interações, score {score:.0}/{max:.0}). \
                 Trate-o como um par. Explore fronteiras do conhecimento, casos extremos, \
                 conexões interdisciplinares e aspectos avançados que não estão em livros introdutórios."
            ),
        }
    }

    fn entry(&self, record: MasteryRecord) -> ProfileEntry {
        ProfileEntry {
            display_name: self.taxonomy.display_name(&record.subject),
            icon: self.taxonomy.icon(&record.subject).to_string(),
            score: (record.score * 10.0).round() / 10.0,
            level: self.policy.level(record.score),
            interaction_count: record.interaction_count,
            last_studied_at: record.last_studied_at,
            topic: record.topic,
            subject: record.subject,
        }
    }
}

/// Instruction used before the first interaction in a subject.
pub fn new_learner_block(display_name: &str) -> String {
    format!(
        "O usuário está começando a estudar {display_name}. \
         Use linguagem introdutória, analogias simples e exemplos básicos."
    )
}
