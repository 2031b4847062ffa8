//! Cosine similarity and nearest-neighbour ranking.

use doki_core::knowledge::{KnowledgeEntry, Neighbor};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the lengths differ or either vector is empty or zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// `1 - cosine_similarity`, in [0, 2].
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// The `k` entries closest to `query`, nearest first.
///
/// Entries whose subject differs from `subject` (when given) are skipped.
/// Equal distances are ordered by entry id so results are stable.
pub fn nearest_neighbors<'a>(
    entries: impl IntoIterator<Item = &'a KnowledgeEntry>,
    query: &[f32],
    k: usize,
    subject: Option<&str>,
) -> Vec<Neighbor> {
    if k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(f32, &KnowledgeEntry)> = entries
        .into_iter()
        .filter(|e| subject.is_none_or(|s| e.metadata.subject == s))
        .map(|e| (cosine_distance(&e.embedding, query), e))
        .collect();

    scored.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.entry_id.cmp(&b.1.entry_id))
    });
    scored.truncate(k);

    scored
        .into_iter()
        .map(|(distance, e)| Neighbor {
            entry_id: e.entry_id.clone(),
            document: e.document.clone(),
            metadata: e.metadata.clone(),
            distance,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use doki_core::knowledge::KnowledgeMetadata;

    fn entry(id: &str, subject: &str, embedding: Vec<f32>) -> KnowledgeEntry {
        KnowledgeEntry {
            entry_id: id.into(),
            document: format!("Document {id}"),
            embedding,
            metadata: KnowledgeMetadata {
                subject: subject.into(),
                topic: None,
                question: format!("Question {id}"),
                user_id: "u1".into(),
            },
        }
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
        assert!(cosine_distance(&v, &v).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
        assert!((cosine_distance(&a, &b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        // [1,1] · [1,0] = 1, |[1,1]| = sqrt(2), |[1,0]| = 1
        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]);
        assert!((sim - 0.7071).abs() < 0.001);
    }

    #[test]
    fn neighbors_nearest_first() {
        let entries = vec![
            entry("a", "fisica", vec![0.0, 1.0, 0.0]),
            entry("b", "fisica", vec![1.0, 0.0, 0.0]),
            entry("c", "fisica", vec![0.5, 0.5, 0.0]),
        ];

        let hits = nearest_neighbors(&entries, &[1.0, 0.0, 0.0], 10, None);
        let ids: Vec<_> = hits.iter().map(|n| n.entry_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert!(hits[0].distance.abs() < 1e-6);
    }

    #[test]
    fn neighbors_respect_k_and_subject() {
        let entries = vec![
            entry("a", "fisica", vec![1.0, 0.0]),
            entry("b", "quimica", vec![1.0, 0.0]),
            entry("c", "fisica", vec![0.9, 0.1]),
        ];

        let hits = nearest_neighbors(&entries, &[1.0, 0.0], 1, Some("fisica"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry_id, "a");

        let hits = nearest_neighbors(&entries, &[1.0, 0.0], 5, Some("quimica"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.subject, "quimica");

        assert!(nearest_neighbors(&entries, &[1.0, 0.0], 0, None).is_empty());
    }

    #[test]
    fn equal_distances_ordered_by_id() {
        let entries = vec![
            entry("z", "fisica", vec![1.0, 0.0]),
            entry("m", "fisica", vec![1.0, 0.0]),
        ];
        let hits = nearest_neighbors(&entries, &[1.0, 0.0], 2, None);
        assert_eq!(hits[0].entry_id, "m");
        assert_eq!(hits[1].entry_id, "z");
    }
}
