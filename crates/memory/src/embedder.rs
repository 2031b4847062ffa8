//! Local feature-hashing embedder.
//!
//! Each lowercased alphanumeric token is hashed with SHA-256 into one of
//! `dimensions` buckets with a sign taken from the digest, then the vector is
//! L2-normalised. No model download, fully deterministic, good enough to find
//! earlier questions that share vocabulary with a new one.

use async_trait::async_trait;
use doki_core::error::MemoryError;
use doki_core::knowledge::Embedder;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Synchronous form of [`Embedder::embed`].
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        if self.dimensions == 0 {
            return Err(MemoryError::EmbeddingFailed(
                "hash embedder configured with zero dimensions".into(),
            ));
        }

        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let digest = Sha256::digest(token.as_bytes());
            let mut head = [0u8; 8];
            head.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(head) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        Ok(vector)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        self.embed_text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::cosine_similarity;

    #[tokio::test]
    async fn deterministic_and_fixed_length() {
        let embedder = HashEmbedder::new(384);
        let a = embedder.embed("O que é uma derivada?").await.unwrap();
        let b = embedder.embed("O que é uma derivada?").await.unwrap();
        assert_eq!(a.len(), 384);
        assert_eq!(a, b);
        assert_eq!(embedder.dimensions(), 384);
    }

    #[test]
    fn output_is_unit_length() {
        let v = HashEmbedder::new(64).embed_text("lei de newton e força").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn case_and_punctuation_do_not_matter() {
        let embedder = HashEmbedder::new(128);
        let a = embedder.embed_text("Fotossíntese!").unwrap();
        let b = embedder.embed_text("fotossíntese").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let embedder = HashEmbedder::new(384);
        let question = embedder.embed_text("como calcular a derivada de uma função").unwrap();
        let related = embedder
            .embed_text("[MATEMATICA] Pergunta: como calcular a derivada de uma função\nResposta: use a regra da cadeia")
            .unwrap();
        let unrelated = embedder
            .embed_text("[HISTORIA] Pergunta: quando começou a revolução francesa\nResposta: em 1789")
            .unwrap();

        let close = cosine_similarity(&question, &related);
        let far = cosine_similarity(&question, &unrelated);
        assert!(close > 0.5, "close = {close}");
        assert!(close > far);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let v = HashEmbedder::new(16).embed_text("   ").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn zero_dimensions_is_an_error() {
        assert!(matches!(
            HashEmbedder::new(0).embed_text("texto"),
            Err(MemoryError::EmbeddingFailed(_))
        ));
    }
}
