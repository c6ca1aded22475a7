// Retriever module
// Embeds a query and fetches the most similar stored chunks


use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embeddings::EmbeddingProvider;
use crate::retry::{Capability, RetryPolicy};
use crate::store::{ScoredRecord, VectorStore};
use crate::{RagError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results fetched per query
    pub top_k: usize,
    /// Results scoring below this are dropped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 2,
            min_score: None,
        }
    }
}

#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    config: RetrievalConfig,
    retry: RetryPolicy,
}

impl Retriever {
    #[inline]
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            config: RetrievalConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    #[inline]
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[inline]
    pub const fn config(&self) -> RetrievalConfig {
        self.config
    }

    /// Retrieve with the configured top-k
    #[inline]
    pub async fn retrieve_default(&self, query: &str) -> Result<Vec<ScoredRecord>> {
        self.retrieve(query, self.config.top_k).await
    }

    /// Up to `top_k` stored chunks ranked by similarity to `query`
    #[inline]
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredRecord>> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidInput("query must not be empty".to_string()));
        }
        if top_k == 0 {
            return Err(RagError::InvalidInput("top_k must be at least 1".to_string()));
        }

        let embedder = &self.embedder;
        let vector = self
            .retry
            .run(Capability::Embedding, move || embedder.embed(query))
            .await?;

        let store = &self.store;
        let vector_ref = &vector;
        let mut results = self
            .retry
            .run(Capability::Store, move || store.query(vector_ref, top_k))
            .await?;

        if let Some(min_score) = self.config.min_score {
            results.retain(|result| result.score >= min_score);
        }

        debug!(
            "Retrieved {} chunks for query of {} chars",
            results.len(),
            query.chars().count()
        );

        Ok(results)
    }
}
