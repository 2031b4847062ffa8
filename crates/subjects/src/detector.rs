//! Keyword scoring over the taxonomy.

use crate::taxonomy::{Subject, Taxonomy};
use serde::{Deserialize, Serialize};

/// Subject key returned when no keyword matches.
pub const GENERAL: &str = "general";

/// Result of classifying one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectDetection {
    pub subject: String,
    pub topic: Option<String>,
    /// In `[0, 0.99]`
    pub confidence: f64,
    /// Keywords of the winning subject, in taxonomy order
    pub matched_keywords: Vec<String>,
}

impl SubjectDetection {
    pub fn general() -> Self {
        Self {
            subject: GENERAL.to_string(),
            topic: None,
            confidence: 0.0,
            matched_keywords: Vec::new(),
        }
    }

    pub fn is_general(&self) -> bool {
        self.subject == GENERAL
    }
}

/// Deterministic classifier over a shared taxonomy.
#[derive(Debug, Clone, Copy)]
pub struct SubjectClassifier {
    taxonomy: &'static Taxonomy,
}

impl Default for SubjectClassifier {
    fn default() -> Self {
        Self::new(Taxonomy::builtin())
    }
}

impl SubjectClassifier {
    pub fn new(taxonomy: &'static Taxonomy) -> Self {
        Self { taxonomy }
    }

    pub fn taxonomy(&self) -> &'static Taxonomy {
        self.taxonomy
    }

    /// Pick the best subject for `text`.
    ///
    /// A subject scores `hits / max(0.1 * keywords, 1)` capped at 1.0, so it
    /// saturates once about a tenth of its keywords appear. On equal scores
    /// the subject declared first wins.
    pub fn detect(&self, text: &str) -> SubjectDetection {
        let lowered = text.to_lowercase();

        let mut best: Option<(&Subject, f64, Vec<&'static str>)> = None;
        for subject in self.taxonomy.subjects() {
            let found: Vec<&'static str> = subject
                .keywords
                .iter()
                .copied()
                .filter(|kw| lowered.contains(kw))
                .collect();
            if found.is_empty() {
                continue;
            }

            let denominator = (subject.keywords.len() as f64 * 0.1).max(1.0);
            let score = (found.len() as f64 / denominator).min(1.0);

            let better = match &best {
                Some((_, best_score, _)) => score > *best_score,
                None => true,
            };
            if better {
                best = Some((subject, score, found));
            }
        }

        let Some((subject, score, found)) = best else {
            tracing::debug!("No subject keywords matched");
            return SubjectDetection::general();
        };

        let topic = subject
            .topics
            .iter()
            .find(|t| t.keywords.iter().any(|kw| lowered.contains(kw)))
            .map(|t| t.key.to_string());

        let detection = SubjectDetection {
            subject: subject.key.to_string(),
            topic,
            confidence: (score * 2.0).min(0.99),
            matched_keywords: found.into_iter().map(String::from).collect(),
        };
        tracing::debug!(
            subject = %detection.subject,
            topic = ?detection.topic,
            confidence = detection.confidence,
            "Subject detected"
        );
        detection
    }

    pub fn display_name(&self, subject: &str) -> String {
        self.taxonomy.display_name(subject)
    }

    pub fn icon(&self, subject: &str) -> &'static str {
        self.taxonomy.icon(subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Topic;

    fn detect(text: &str) -> SubjectDetection {
        SubjectClassifier::default().detect(text)
    }

    #[test]
    fn quadratic_equation_is_algebra() {
        let d = detect("Como resolver uma equação de segundo grau?");
        assert_eq!(d.subject, "matematica");
        assert_eq!(d.topic.as_deref(), Some("algebra"));
        assert_eq!(d.matched_keywords, vec!["equação"]);
        assert!(d.confidence > 0.0);
        // 1 hit out of 23 keywords: 1 / 2.3, doubled
        assert!((d.confidence - 2.0 / 2.3).abs() < 1e-9);
    }

    #[test]
    fn empty_text_is_general() {
        let d = detect("");
        assert_eq!(d, SubjectDetection::general());
        assert!(d.is_general());
        assert_eq!(d.confidence, 0.0);
    }

    #[test]
    fn no_hits_is_general() {
        let d = detect("Bom dia, tudo bem?");
        assert_eq!(d.subject, GENERAL);
        assert!(d.topic.is_none());
        assert!(d.matched_keywords.is_empty());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let d = detect("O que é o DNA?");
        assert_eq!(d.subject, "biologia");
        assert_eq!(d.topic.as_deref(), Some("genetica"));
    }

    #[test]
    fn confidence_is_capped_below_one() {
        let d = detect("força, energia, velocidade e aceleração");
        assert_eq!(d.subject, "fisica");
        assert_eq!(d.confidence, 0.99);
        assert_eq!(d.topic.as_deref(), Some("mecanica"));
        assert_eq!(d.matched_keywords.len(), 4);
    }

    #[test]
    fn subject_without_topics_has_no_topic() {
        let d = detect("Como calcular juros compostos?");
        assert_eq!(d.subject, "matematica_financeira");
        assert!(d.topic.is_none());
    }

    #[test]
    fn first_matching_topic_wins() {
        // "integral" (calculo) is declared before "matriz" (algebra)
        let d = detect("integral de uma matriz");
        assert_eq!(d.subject, "matematica");
        assert_eq!(d.topic.as_deref(), Some("calculo"));
    }

    #[test]
    fn tie_goes_to_first_declared_subject() {
        const TIED_SUBJECTS: &[Subject] = &[
            Subject {
                key: "primeira",
                display_name: "Primeira",
                icon: "1️⃣",
                keywords: &["alfa"],
                topics: &[],
            },
            Subject {
                key: "segunda",
                display_name: "Segunda",
                icon: "2️⃣",
                keywords: &["beta"],
                topics: &[Topic { key: "b", keywords: &["beta"] }],
            },
        ];
        static TIED: Taxonomy = Taxonomy::new(TIED_SUBJECTS);
        let classifier = SubjectClassifier::new(&TIED);

        let d = classifier.detect("alfa e beta");
        assert_eq!(d.subject, "primeira");
        assert_eq!(d.confidence, 0.99);

        assert_eq!(classifier.detect("só beta").topic.as_deref(), Some("b"));
    }

    #[test]
    fn higher_score_beats_earlier_subject() {
        // matematica: 1/2.3, programacao: 3/2.4
        let d = detect("função recursiva em python com array");
        assert_eq!(d.subject, "programacao");
    }

    #[test]
    fn lookups_delegate_to_taxonomy() {
        let classifier = SubjectClassifier::default();
        assert_eq!(classifier.display_name("quimica"), "Química");
        assert_eq!(classifier.icon("desconhecida"), "📚");
    }

    #[test]
    fn detection_serializes() {
        let json = serde_json::to_value(detect("O que é fotossíntese?")).unwrap();
        assert_eq!(json["subject"], "biologia");
        assert_eq!(json["matched_keywords"][0], "fotossíntese");
    }
}
