//! The safety gate, first step of every message.
//!
//! Evaluation order matters because categories carry different tone:
//!
//! 1. jailbreak / override attempts
//! 2. self-harm (empathetic reply, never the colder "out of scope" one)
//! 3. crime and explicit content (one combined set)
//! 4. harmful requests dressed up as schoolwork
//! 5. length limit (warning)
//!
//! First match wins. The gate is pure: it holds only compiled patterns and
//! never records anything itself.

use crate::patterns;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// The categorical decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyOutcome {
    Approved,
    Blocked,
    Warning,
}

/// Why a message was not approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyReason {
    JailbreakAttempt,
    SelfHarm,
    Crime,
    Explicit,
    StudyBypassAttempt,
    MessageTooLong,
}

impl SafetyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JailbreakAttempt => "jailbreak_attempt",
            Self::SelfHarm => "self_harm",
            Self::Crime => "crime",
            Self::Explicit => "explicit",
            Self::StudyBypassAttempt => "study_bypass_attempt",
            Self::MessageTooLong => "message_too_long",
        }
    }
}

impl std::fmt::Display for SafetyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The gate's decision plus the canned message shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub outcome: SafetyOutcome,
    /// `None` only when approved
    pub reason: Option<SafetyReason>,
    /// Empty when approved
    pub user_message: String,
}

impl SafetyVerdict {
    pub fn approved() -> Self {
        Self {
            outcome: SafetyOutcome::Approved,
            reason: None,
            user_message: String::new(),
        }
    }

    fn blocked(reason: SafetyReason) -> Self {
        Self {
            outcome: SafetyOutcome::Blocked,
            reason: Some(reason),
            user_message: canned_reply(reason).to_string(),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.outcome == SafetyOutcome::Approved
    }
}

const CRIME_REPLY: &str = "🚫 Essa pergunta envolve atividades ilegais ou prejudiciais. \
    A Doki foi criada para te ajudar a aprender. Posso te ajudar com alguma matéria ou tópico de estudo?";

const EXPLICIT_REPLY: &str = "🚫 Esse tipo de conteúdo não está dentro do escopo da Doki. \
    Estou aqui para te ajudar nos estudos! Tem alguma matéria que você quer explorar?";

const SELF_HARM_REPLY: &str = "💙 Percebi que sua mensagem pode indicar que você está passando por um momento difícil. \
    Se precisar de apoio, o CVV (Centro de Valorização da Vida) atende 24h pelo número 188 ou pelo chat em cvv.org.br. \
    Estou aqui se quiser conversar sobre outra coisa.";

const JAILBREAK_REPLY: &str = "🛡️ Identificamos uma tentativa de contornar as diretrizes da Doki. \
    Minhas regras existem para garantir um ambiente seguro de aprendizado.";

fn canned_reply(reason: SafetyReason) -> &'static str {
    match reason {
        SafetyReason::JailbreakAttempt => JAILBREAK_REPLY,
        SafetyReason::SelfHarm => SELF_HARM_REPLY,
        SafetyReason::Explicit => EXPLICIT_REPLY,
        // Pretext attempts get the same reply as the crime they wrap.
        SafetyReason::Crime | SafetyReason::StudyBypassAttempt => CRIME_REPLY,
        SafetyReason::MessageTooLong => "Sua mensagem é muito longa. Por favor, reduza o tamanho.",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SafetyError {
    #[error("Invalid safety pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Compiled pattern groups plus the length limit.
///
/// Build once at startup and share it; evaluation takes `&self`.
#[derive(Debug)]
pub struct SafetyGate {
    jailbreak: Vec<Regex>,
    self_harm: Vec<Regex>,
    blocked: Vec<Regex>,
    study_pretext: Vec<Regex>,
    max_message_length: usize,
}

fn compile<S: AsRef<str>>(sources: &[S]) -> Result<Vec<Regex>, SafetyError> {
    sources
        .iter()
        .map(|p| {
            RegexBuilder::new(p.as_ref())
                .case_insensitive(true)
                .build()
                .map_err(|source| SafetyError::InvalidPattern {
                    pattern: p.as_ref().to_string(),
                    source,
                })
        })
        .collect()
}

impl SafetyGate {
    pub fn new(max_message_length: usize) -> Result<Self, SafetyError> {
        Ok(Self {
            jailbreak: compile(patterns::JAILBREAK)?,
            self_harm: compile(patterns::SELF_HARM)?,
            blocked: compile(patterns::BLOCKED)?,
            study_pretext: compile(&patterns::study_pretext())?,
            max_message_length,
        })
    }

    pub fn from_config(config: &doki_config::SafetyConfig) -> Result<Self, SafetyError> {
        Self::new(config.max_message_length)
    }

    pub fn max_message_length(&self) -> usize {
        self.max_message_length
    }

    /// Classify `text`.
    pub fn evaluate(&self, text: &str) -> SafetyVerdict {
        let normalized = text.trim().to_lowercase();

        if any_match(&self.jailbreak, &normalized) {
            return SafetyVerdict::blocked(SafetyReason::JailbreakAttempt);
        }

        if any_match(&self.self_harm, &normalized) {
            return SafetyVerdict::blocked(SafetyReason::SelfHarm);
        }

        if let Some(matched) = self.blocked.iter().find_map(|re| re.find(&normalized)) {
            let fragment = matched.as_str();
            let reason = if patterns::EXPLICIT_MARKERS.iter().any(|w| fragment.contains(w)) {
                SafetyReason::Explicit
            } else if any_match(&self.study_pretext, &normalized) {
                SafetyReason::StudyBypassAttempt
            } else {
                SafetyReason::Crime
            };
            return SafetyVerdict::blocked(reason);
        }

        if any_match(&self.study_pretext, &normalized) {
            return SafetyVerdict::blocked(SafetyReason::StudyBypassAttempt);
        }

        if text.chars().count() > self.max_message_length {
            return SafetyVerdict {
                outcome: SafetyOutcome::Warning,
                reason: Some(SafetyReason::MessageTooLong),
                user_message: format!(
                    "Sua mensagem é muito longa. Por favor, reduza para no máximo {} caracteres.",
                    self.max_message_length
                ),
            };
        }

        SafetyVerdict::approved()
    }
}

fn any_match(group: &[Regex], text: &str) -> bool {
    group.iter().any(|re| re.is_match(text))
}
