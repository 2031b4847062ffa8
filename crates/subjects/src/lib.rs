//! Subject detection for Doki.
//!
//! A fixed taxonomy of school subjects, each with a keyword set and optional
//! topic groups, and a deterministic classifier that scores every subject by
//! keyword hits.

pub mod detector;
pub mod taxonomy;

pub use detector::{GENERAL, SubjectClassifier, SubjectDetection};
pub use taxonomy::{Subject, Taxonomy, Topic};
