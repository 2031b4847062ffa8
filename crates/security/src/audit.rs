//! Moderation audit log.
//!
//! Every message the gate rejects is recorded with the user, the reason and a
//! short excerpt. The excerpt is capped so logs never carry whole messages.

use crate::gate::{SafetyOutcome, SafetyReason, SafetyVerdict};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

const EXCERPT_CHARS: usize = 80;
const DEFAULT_CAPACITY: usize = 1000;

/// A single rejected message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub outcome: SafetyOutcome,
    pub reason: Option<SafetyReason>,
    pub excerpt: String,
}

/// Where audit entries are forwarded.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Keeps the most recent entries in memory and forwards each one to its sinks.
pub struct AuditLogger {
    entries: Mutex<VecDeque<AuditEntry>>,
    capacity: usize,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("entry_count", &self.count())
            .field("capacity", &self.capacity)
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger {
    pub fn new() -> Self {
        Self::with_sinks(Vec::new())
    }

    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: DEFAULT_CAPACITY,
            sinks,
        }
    }

    /// Oldest entries are dropped once `capacity` is reached. Zero keeps nothing
    /// in memory but still forwards to sinks.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<AuditEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a verdict for `user_id`. Approved verdicts are ignored.
    pub fn record(&self, user_id: &str, text: &str, verdict: &SafetyVerdict) {
        if verdict.is_approved() {
            return;
        }

        let entry = AuditEntry {
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            outcome: verdict.outcome,
            reason: verdict.reason,
            excerpt: excerpt(text),
        };

        for sink in &self.sinks {
            sink.record(&entry);
        }

        if self.capacity == 0 {
            return;
        }
        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn entries_by_reason(&self, reason: SafetyReason) -> Vec<AuditEntry> {
        self.lock()
            .iter()
            .filter(|e| e.reason == Some(reason))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(EXCERPT_CHARS).collect();
    cut.push('…');
    cut
}

/// Emits each entry as a `tracing` event at WARN.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        tracing::warn!(
            user_id = %entry.user_id,
            outcome = ?entry.outcome,
            reason = entry.reason.map(|r| r.as_str()).unwrap_or("none"),
            excerpt = %entry.excerpt,
            "AUDIT"
        );
    }
}
