//! Offline embedder based on feature hashing.
//!
//! Every lowercase word and word bigram is hashed into one of `dimension`
//! buckets and the resulting count vector is L2-normalized. Texts sharing
//! vocabulary end up with a high cosine similarity, which is enough for local
//! experiments and tests without a running model server.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{Embedding, EmbeddingProvider};
use crate::{RagError, Result};

#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    pub(crate) dimension: usize,
}

impl HashingEmbedder {
    #[inline]
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::Config(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    /// Compute the embedding synchronously
    #[inline]
    pub fn embed_text(&self, text: &str) -> Embedding {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        let mut vector = vec![0.0_f32; self.dimension];
        for word in &words {
            vector[self.bucket(word)] += 1.0;
        }
        for pair in words.windows(2) {
            vector[self.bucket(&format!("{} {}", pair[0], pair[1]))] += 0.5;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }

    fn bucket(&self, feature: &str) -> usize {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bytes = [0_u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(bytes) % self.dimension as u64) as usize
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.embed_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::cosine_similarity;

    #[test]
    fn produces_configured_dimension() {
        let embedder = HashingEmbedder::new(384).expect("dimension should be valid");
        assert_eq!(embedder.embed_text("hello world").len(), 384);
        assert!(HashingEmbedder::new(0).is_err());
    }

    #[test]
    fn is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64).expect("dimension should be valid");
        let a = embedder.embed_text("The cat sat on the mat");
        let b = embedder.embed_text("the CAT sat on the mat!");
        assert_eq!(a, b);

        let norm = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::new(384).expect("dimension should be valid");
        let query = embedder.embed_text("how do cats sleep");
        let related = embedder.embed_text("cats sleep most of the day");
        let unrelated = embedder.embed_text("quarterly revenue grew in europe");

        assert!(
            cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated),
            "related text should be closer"
        );
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(16).expect("dimension should be valid");
        assert!(embedder.embed_text("").iter().all(|v| *v == 0.0));
    }
}
