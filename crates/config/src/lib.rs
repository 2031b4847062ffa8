//! Configuration loading, validation, and management for Doki.
//!
//! Loads configuration from `~/.doki/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.doki/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Assistant identity
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Safety gate settings
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Mastery scoring model
    #[serde(default)]
    pub mastery: MasteryConfig,

    /// Context recall settings
    #[serde(default)]
    pub recall: RecallConfig,

    /// Embedding function
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Where mastery records and knowledge entries live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Text-generation backend
    #[serde(default)]
    pub llm: LlmConfig,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_name")]
    pub name: String,

    #[serde(default = "default_assistant_version")]
    pub version: String,
}

fn default_assistant_name() -> String {
    "Doki".into()
}
fn default_assistant_version() -> String {
    "1.0".into()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: default_assistant_name(),
            version: default_assistant_version(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Messages longer than this (in characters) get a warning verdict
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,

    /// Record blocked messages through the audit log
    #[serde(default = "default_true")]
    pub audit: bool,
}

fn default_max_message_length() -> usize {
    4000
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            max_message_length: default_max_message_length(),
            audit: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryConfig {
    /// Points added per interaction
    #[serde(default = "default_increment")]
    pub increment: f64,

    #[serde(default = "default_max_score")]
    pub max_score: f64,

    #[serde(default = "default_intermediate_threshold")]
    pub intermediate_threshold: f64,

    #[serde(default = "default_advanced_threshold")]
    pub advanced_threshold: f64,

    #[serde(default = "default_expert_threshold")]
    pub expert_threshold: f64,
}

fn default_increment() -> f64 {
    2.5
}
fn default_max_score() -> f64 {
    100.0
}
fn default_intermediate_threshold() -> f64 {
    15.0
}
fn default_advanced_threshold() -> f64 {
    40.0
}
fn default_expert_threshold() -> f64 {
    70.0
}

impl Default for MasteryConfig {
    fn default() -> Self {
        Self {
            increment: default_increment(),
            max_score: default_max_score(),
            intermediate_threshold: default_intermediate_threshold(),
            advanced_threshold: default_advanced_threshold(),
            expert_threshold: default_expert_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallConfig {
    /// Neighbours requested from the vector store
    #[serde(default = "default_recall_limit")]
    pub limit: usize,

    /// Recall results rendered into the prompt
    #[serde(default = "default_prompt_items")]
    pub prompt_items: usize,

    /// Characters of each recalled document shown in the prompt
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,

    /// Characters of the answer kept in a stored document
    #[serde(default = "default_answer_chars")]
    pub answer_chars: usize,

    /// Characters of the question kept in entry metadata
    #[serde(default = "default_question_chars")]
    pub question_chars: usize,
}

fn default_recall_limit() -> usize {
    5
}
fn default_prompt_items() -> usize {
    3
}
fn default_snippet_chars() -> usize {
    400
}
fn default_answer_chars() -> usize {
    500
}
fn default_question_chars() -> usize {
    200
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            limit: default_recall_limit(),
            prompt_items: default_prompt_items(),
            snippet_chars: default_snippet_chars(),
            answer_chars: default_answer_chars(),
            question_chars: default_question_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "hash" (local, deterministic) or "provider" (the LLM backend's embeddings endpoint)
    #[serde(default = "default_embedding_backend")]
    pub backend: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

fn default_embedding_backend() -> String {
    "hash".into()
}
fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".into()
}
fn default_dimensions() -> usize {
    384
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: default_embedding_backend(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "sqlite" or "memory"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// SQLite file; defaults to `~/.doki/doki.sqlite`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_storage_backend() -> String {
    "sqlite".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: None,
        }
    }
}

impl StorageConfig {
    /// The SQLite path to open, falling back to the config directory.
    pub fn sqlite_path(&self) -> PathBuf {
        self.path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("doki.sqlite"))
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama", "openai_compatible" or "none"
    #[serde(default = "default_llm_backend")]
    pub backend: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on a single generation call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Prior turns forwarded to the backend
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_llm_backend() -> String {
    "ollama".into()
}
fn default_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "mistral".into()
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_temperature() -> f32 {
    0.3
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_history_window() -> usize {
    8
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: default_llm_backend(),
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            history_window: default_history_window(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("backend", &self.backend)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("history_window", &self.history_window)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.doki/config.toml).
    ///
    /// Environment variables override the file:
    /// - `DOKI_LLM_BACKEND`, `DOKI_LLM_MODEL`, `DOKI_LLM_BASE_URL`
    /// - `DOKI_LLM_API_KEY`
    /// - `DOKI_STORAGE_PATH`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(backend) = lookup("DOKI_LLM_BACKEND") {
            self.llm.backend = backend;
        }
        if let Some(model) = lookup("DOKI_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = lookup("DOKI_LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(key) = lookup("DOKI_LLM_API_KEY").filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(path) = lookup("DOKI_STORAGE_PATH") {
            self.storage.path = Some(path);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".doki")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.safety.max_message_length == 0 {
            return Err(ConfigError::ValidationError(
                "safety.max_message_length must be > 0".into(),
            ));
        }

        let m = &self.mastery;
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(m.increment) || !positive(m.max_score) {
            return Err(ConfigError::ValidationError(
                "mastery.increment and mastery.max_score must be finite and > 0".into(),
            ));
        }
        if !(0.0 < m.intermediate_threshold
            && m.intermediate_threshold < m.advanced_threshold
            && m.advanced_threshold < m.expert_threshold
            && m.expert_threshold <= m.max_score)
        {
            return Err(ConfigError::ValidationError(
                "mastery thresholds must ascend strictly and stay within max_score".into(),
            ));
        }

        if self.embedding.dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimensions must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.backend, "ollama");
        assert_eq!(config.safety.max_message_length, 4000);
        assert_eq!(config.mastery.increment, 2.5);
        assert_eq!(config.recall.limit, 5);
    }

    #[test]
    fn config_roundtrip_toml() {
        let toml_str = AppConfig::default_toml();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.llm.model, "mistral");
        assert_eq!(parsed.mastery.expert_threshold, 70.0);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[llm]\nbackend = \"openai_compatible\"\nmodel = \"llama3.2\"\n\n[mastery]\nincrement = 5.0\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.llm.backend, "openai_compatible");
        assert_eq!(config.llm.model, "llama3.2");
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.mastery.increment, 5.0);
        assert_eq!(config.mastery.max_score, 100.0);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm\nbackend = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.llm.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unordered_thresholds_rejected() {
        let mut config = AppConfig::default();
        config.mastery.advanced_threshold = 80.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_finite_mastery_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        for body in ["[mastery]\nincrement = nan\n", "[mastery]\nmax_score = inf\n"] {
            std::fs::write(&path, body).unwrap();
            assert!(
                matches!(AppConfig::load_from(&path), Err(ConfigError::ValidationError(_))),
                "{body}"
            );
        }

        let mut config = AppConfig::default();
        config.llm.temperature = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.assistant.name, "Doki");
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DOKI_LLM_BACKEND", "none"),
            ("DOKI_LLM_API_KEY", "sk-test"),
            ("DOKI_STORAGE_PATH", "/tmp/doki-test.sqlite"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.backend, "none");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(
            config.storage.sqlite_path(),
            PathBuf::from("/tmp/doki-test.sqlite")
        );
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret"));
    }
}
