//! Scriptable embedder for tests.
//!
//! Wraps a [`HashingEmbedder`] and can be switched into an outage mode in
//! which every call fails with [`RagError::EmbeddingFailure`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{Embedding, EmbeddingProvider, HashingEmbedder};
use crate::{RagError, Result};

#[derive(Debug, Clone)]
pub struct MockEmbedder {
    inner: HashingEmbedder,
    unavailable: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl MockEmbedder {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            inner: HashingEmbedder { dimension: dimension.max(1) },
            unavailable: Arc::new(AtomicBool::new(false)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Simulate the model server going away (or coming back)
    #[inline]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `embed`/`embed_batch` calls made so far
    #[inline]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    #[inline]
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    #[inline]
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RagError::EmbeddingFailure(
                "embedding service unreachable".to_string(),
            ));
        }
        Ok(self.inner.embed_text(text))
    }

    #[inline]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RagError::EmbeddingFailure(
                "embedding service unreachable".to_string(),
            ));
        }
        Ok(texts.iter().map(|t| self.inner.embed_text(t)).collect())
    }
}
