// Vector store module
// Persists embedded chunks and answers nearest-neighbour queries

pub mod lance;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Result;
use crate::embeddings::Embedding;
use crate::splitter::Metadata;

pub use lance::LanceVectorStore;
pub use memory::InMemoryVectorStore;

/// Metadata key holding the SHA-256 of the record text
pub const CONTENT_HASH_KEY: &str = "content_hash";

/// A record waiting to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub vector: Embedding,
    pub text: String,
    pub metadata: Metadata,
}

/// A record as persisted by a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub vector: Embedding,
    pub text: String,
    pub metadata: Metadata,
}

/// One hit of a similarity query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    /// Cosine similarity to the query vector, higher is closer
    pub score: f32,
}

/// Storage and similarity search over fixed-dimension vectors.
///
/// Implementations validate a whole batch before writing any of it, so a
/// failed `add` leaves the store unchanged, and concurrent readers never see
/// half a batch.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Dimension every stored and queried vector must have
    fn dimension(&self) -> usize;

    /// Persist records, returning their assigned ids in input order
    async fn add(&self, records: Vec<NewRecord>) -> Result<Vec<String>>;

    /// Up to `top_k` records ordered by descending cosine similarity
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>>;

    async fn count(&self) -> Result<usize>;

    /// Whether any stored record carries this content hash
    async fn contains_content_hash(&self, hash: &str) -> Result<bool>;

    /// Compact storage after a batch of writes. No-op unless the backend
    /// keeps data files.
    async fn optimize(&self) -> Result<()> {
        Ok(())
    }
}

/// Cosine similarity of two vectors. Zero-magnitude vectors score 0.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0_f32;
    let mut a_norm = 0.0_f32;
    let mut b_norm = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        a_norm += x * x;
        b_norm += y * y;
    }

    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    dot / (a_norm.sqrt() * b_norm.sqrt())
}

/// Hex-encoded SHA-256 of a chunk's text
#[inline]
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = [0.3, -1.2, 4.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_ignores_magnitude() {
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 4.0, 6.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_and_opposite_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_with_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn content_hash_is_stable_hex() {
        let hash = content_hash("hello");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, content_hash("hello"));
        assert_ne!(hash, content_hash("hello "));
    }
}
