//! Safety module for Doki: the pattern-based allow/deny gate in front of
//! the pipeline, plus structured logging of what it rejected.
//!
//! Provides:
//! - **Gate**: classifies raw text as approved, blocked or warning
//! - **Patterns**: the fixed pattern groups the gate compiles once
//! - **Audit logging**: a record of every rejected message

pub mod audit;
pub mod gate;
pub mod patterns;

pub use audit::{AuditEntry, AuditLogger, AuditSink, TracingSink};
pub use gate::{SafetyError, SafetyGate, SafetyOutcome, SafetyReason, SafetyVerdict};
