// Embeddings module
// Text-to-vector capability and its implementations

pub mod hashing;
pub mod mock;
pub mod ollama;

use async_trait::async_trait;

use crate::{RagError, Result};

pub use hashing::HashingEmbedder;
pub use mock::MockEmbedder;
pub use ollama::OllamaClient;

/// A fixed-dimension embedding vector
pub type Embedding = Vec<f32>;

/// Dimension of the default `all-minilm` model
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;

/// Maps text to embedding vectors of a fixed dimension.
///
/// Failures to reach the backing model are reported as
/// [`RagError::EmbeddingFailure`]; vectors of the wrong length as
/// [`RagError::DimensionMismatch`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Dimension of every vector this provider returns
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed several texts, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

/// Check that a vector has the expected length
#[inline]
pub const fn check_dimension(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(RagError::DimensionMismatch {
            expected,
            actual: vector.len(),
        })
    }
}
