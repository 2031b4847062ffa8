//! The orchestrator: one message in, one decision out.

use crate::generator::ResponseGenerator;
use crate::mastery::{MasteryPolicy, MasteryTracker};
use crate::overview::{LeaderboardEntry, StudyOverview};
use crate::prompt::PromptSettings;
use crate::recall::{ContextRecall, RecallPolicy, RecallResult};
use doki_config::AppConfig;
use doki_core::error::MemoryError;
use doki_core::knowledge::{Embedder, KnowledgeStore};
use doki_core::mastery::MasteryStore;
use doki_core::message::Turn;
use doki_core::provider::Provider;
use doki_security::{AuditLogger, SafetyError, SafetyGate, SafetyReason, SafetyVerdict, TracingSink};
use doki_subjects::{SubjectClassifier, SubjectDetection};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum BrainError {
    #[error("Safety gate setup failed: {0}")]
    Safety(#[from] SafetyError),
}

/// A message the gate refused. Nothing downstream ran.
#[derive(Debug, Clone)]
pub struct BlockedMessage {
    pub verdict: SafetyVerdict,
}

impl BlockedMessage {
    /// The canned reply for the requester.
    pub fn response(&self) -> &str {
        &self.verdict.user_message
    }
}

/// An approved message, ready for generation.
#[derive(Debug, Clone)]
pub struct PreparedMessage {
    pub detection: SubjectDetection,
    pub system_prompt: String,
    /// System turn, windowed prior turns, then the new user turn
    pub messages: Vec<Turn>,
    pub recalled: Vec<RecallResult>,
    /// `None` for the general subject
    pub mastery_block: Option<String>,
}

/// Outcome of the pre-generation phase.
#[derive(Debug, Clone)]
pub enum Incoming {
    Blocked(BlockedMessage),
    Ready(Box<PreparedMessage>),
}

impl Incoming {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Incoming::Blocked(_))
    }
}

/// Result of [`Brain::respond`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrainReply {
    pub response: String,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SafetyReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub confidence: f64,
}

/// Gate, classifier, tracker, recall and generator wired together.
///
/// Holds no per-request state; share one instance behind an `Arc`.
pub struct Brain {
    gate: SafetyGate,
    classifier: SubjectClassifier,
    mastery: MasteryTracker,
    recall: ContextRecall,
    generator: ResponseGenerator,
    prompt: PromptSettings,
    audit: Option<Arc<AuditLogger>>,
}

impl Brain {
    pub fn new(
        gate: SafetyGate,
        mastery: MasteryTracker,
        recall: ContextRecall,
        generator: ResponseGenerator,
    ) -> Self {
        Self {
            gate,
            classifier: SubjectClassifier::default(),
            mastery,
            recall,
            generator,
            prompt: PromptSettings::default(),
            audit: None,
        }
    }

    /// Build every component from configuration around the given stores
    /// and backends.
    pub fn from_config(
        config: &AppConfig,
        mastery_store: Arc<dyn MasteryStore>,
        knowledge_store: Arc<dyn KnowledgeStore>,
        embedder: Arc<dyn Embedder>,
        provider: Arc<dyn Provider>,
    ) -> Result<Self, BrainError> {
        let gate = SafetyGate::from_config(&config.safety)?;
        let mastery = MasteryTracker::new(mastery_store, MasteryPolicy::from_config(&config.mastery));
        let recall = ContextRecall::new(knowledge_store, embedder)
            .with_policy(RecallPolicy::from_config(&config.recall));
        let generator = ResponseGenerator::from_config(provider, &config.llm);

        info!(
            backend = generator.backend(),
            model = generator.model(),
            "Brain ready"
        );

        let brain = Self::new(gate, mastery, recall, generator)
            .with_prompt(PromptSettings::from_config(config));
        if config.safety.audit {
            let audit = AuditLogger::with_sinks(vec![Box::new(TracingSink)]);
            Ok(brain.with_audit(Arc::new(audit)))
        } else {
            Ok(brain)
        }
    }

    pub fn with_classifier(mut self, classifier: SubjectClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_prompt(mut self, prompt: PromptSettings) -> Self {
        self.prompt = prompt;
        self
    }

    /// Record every refused message here.
    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn audit(&self) -> Option<&Arc<AuditLogger>> {
        self.audit.as_ref()
    }

    pub fn classifier(&self) -> &SubjectClassifier {
        &self.classifier
    }

    pub fn gate(&self) -> &SafetyGate {
        &self.gate
    }

    pub fn generator(&self) -> &ResponseGenerator {
        &self.generator
    }

    /// Pre-generation phase: gate, classify, recall, contextualize, assemble.
    pub async fn process_incoming(&self, user_id: &str, text: &str, prior_turns: &[Turn]) -> Incoming {
        let verdict = self.gate.evaluate(text);
        if !verdict.is_approved() {
            info!(
                user_id,
                outcome = ?verdict.outcome,
                reason = verdict.reason.map(|r| r.as_str()).unwrap_or_default(),
                "Message refused"
            );
            if let Some(audit) = &self.audit {
                audit.record(user_id, text, &verdict);
            }
            return Incoming::Blocked(BlockedMessage { verdict });
        }

        let detection = self.classifier.detect(text);
        debug!(
            user_id,
            subject = %detection.subject,
            topic = detection.topic.as_deref().unwrap_or("-"),
            confidence = detection.confidence,
            "Message classified"
        );

        let filter = (!detection.is_general()).then_some(detection.subject.as_str());
        let recalled = self
            .recall
            .recall(user_id, text, filter, self.prompt.recall_limit)
            .await;

        let mastery_block = if detection.is_general() {
            None
        } else {
            Some(self.mastery.context_block(user_id, &detection.subject).await)
        };

        let history = self.prompt.history_block(&recalled);
        let system_prompt = self
            .prompt
            .system_prompt(mastery_block.as_deref(), history.as_deref());
        let messages = self.prompt.conversation(system_prompt.clone(), prior_turns, text);

        Incoming::Ready(Box::new(PreparedMessage {
            detection,
            system_prompt,
            messages,
            recalled,
            mastery_block,
        }))
    }

    /// Post-generation phase: bump mastery and remember the exchange.
    ///
    /// Skipped for the general subject. Failures are logged and swallowed
    /// because the answer has already been delivered.
    pub async fn finalize(
        &self,
        user_id: &str,
        question: &str,
        answer: &str,
        subject: &str,
        topic: Option<&str>,
        entry_id: Option<&str>,
    ) {
        if subject == doki_subjects::GENERAL {
            return;
        }

        if let Err(e) = self.mastery.record_interaction(user_id, subject, topic).await {
            warn!(user_id, subject, "Mastery update failed: {e}");
        }

        if let Err(e) = self
            .recall
            .remember(user_id, question, answer, subject, topic, entry_id)
            .await
        {
            warn!(user_id, subject, "Could not remember exchange: {e}");
        }
    }

    /// The whole pipeline in one call.
    pub async fn respond(&self, user_id: &str, text: &str, prior_turns: &[Turn]) -> BrainReply {
        let prepared = match self.process_incoming(user_id, text, prior_turns).await {
            Incoming::Blocked(blocked) => {
                return BrainReply {
                    response: blocked.verdict.user_message,
                    blocked: true,
                    reason: blocked.verdict.reason,
                    subject: None,
                    subject_display: None,
                    subject_icon: None,
                    topic: None,
                    confidence: 0.0,
                };
            }
            Incoming::Ready(prepared) => prepared,
        };

        let PreparedMessage {
            detection, messages, ..
        } = *prepared;
        let answer = self.generator.generate(messages).await;

        let entry_id = format!("msg_{}", uuid::Uuid::new_v4().simple());
        self.finalize(
            user_id,
            text,
            &answer,
            &detection.subject,
            detection.topic.as_deref(),
            Some(&entry_id),
        )
        .await;

        BrainReply {
            response: answer,
            blocked: false,
            reason: None,
            subject_display: Some(self.classifier.display_name(&detection.subject)),
            subject_icon: Some(self.classifier.icon(&detection.subject).to_string()),
            subject: Some(detection.subject),
            topic: detection.topic,
            confidence: detection.confidence,
        }
    }

    /// Profile, totals and recall summary for one user.
    pub async fn overview(&self, user_id: &str) -> Result<StudyOverview, MemoryError> {
        let profile = self.mastery.profile(user_id).await?;
        let summary = self.recall.knowledge_summary(user_id).await;
        Ok(StudyOverview::new(user_id, profile, summary))
    }

    pub async fn leaderboard(&self, user_id: &str) -> Result<Vec<LeaderboardEntry>, MemoryError> {
        Ok(self.overview(user_id).await?.leaderboard())
    }
}
