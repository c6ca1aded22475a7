// Pipeline module
// Builds every component from a Config

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::chain::ConversationalChain;
use crate::chat::{ChatProvider, OpenAiClient};
use crate::config::{Config, EmbeddingBackend, StoreBackend};
use crate::embeddings::{EmbeddingProvider, HashingEmbedder, OllamaClient};
use crate::ingest::Ingestor;
use crate::retriever::Retriever;
use crate::retry::RetryPolicy;
use crate::splitter::DocumentSplitter;
use crate::store::{InMemoryVectorStore, LanceVectorStore, VectorStore};
use crate::{RagError, Result};

/// Shared handles to the configured capabilities
#[derive(Clone)]
pub struct Pipeline {
    config: Config,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    retry: RetryPolicy,
}

impl Pipeline {
    /// Open the configured embedder and store. The chat provider is created
    /// lazily by [`Pipeline::session`], so ingestion works without an API key.
    #[inline]
    pub async fn from_config(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let embedder = build_embedder(config)?;
        let store = build_store(config).await?;

        Self::from_parts(config.clone(), embedder, store)
    }

    /// Assemble a pipeline from already constructed capabilities
    #[inline]
    pub fn from_parts(
        config: Config,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        if embedder.dimension() != store.dimension() {
            return Err(RagError::DimensionMismatch {
                expected: store.dimension(),
                actual: embedder.dimension(),
            });
        }

        let retry = RetryPolicy::from_config(&config.retry);
        Ok(Self {
            config,
            embedder,
            store,
            retry,
        })
    }

    #[inline]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn store(&self) -> Arc<dyn VectorStore> {
        Arc::clone(&self.store)
    }

    #[inline]
    pub fn embedder(&self) -> Arc<dyn EmbeddingProvider> {
        Arc::clone(&self.embedder)
    }

    #[inline]
    pub fn ingestor(&self) -> Result<Ingestor> {
        let splitter = DocumentSplitter::new(self.config.splitter)?;
        Ok(
            Ingestor::new(splitter, self.embedder(), self.store())?
                .with_config(self.config.ingest)
                .with_retry(self.retry),
        )
    }

    #[inline]
    pub fn retriever(&self) -> Retriever {
        Retriever::new(self.embedder(), self.store())
            .with_config(self.config.retrieval)
            .with_retry(self.retry)
    }

    /// A new conversation using the configured chat endpoint
    #[inline]
    pub fn session(&self) -> Result<ConversationalChain> {
        let chat = OpenAiClient::new(&self.config.chat)
            .map_err(|e| RagError::Config(format!("{:#}", e)))?;
        Ok(self.session_with(Arc::new(chat)))
    }

    /// A new conversation using a caller-supplied chat provider
    #[inline]
    pub fn session_with(&self, chat: Arc<dyn ChatProvider>) -> ConversationalChain {
        ConversationalChain::new(self.retriever(), chat)
            .with_history_config(self.config.history)
            .with_retry(self.retry)
    }
}

fn build_embedder(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let dimension = config.embedding.embedding_dimension as usize;
    match config.embedding.backend {
        EmbeddingBackend::Ollama => {
            // Retries happen in RetryPolicy, one HTTP attempt per call here
            let client = OllamaClient::new(&config.embedding)
                .map_err(|e| RagError::Config(format!("{:#}", e)))?
                .with_timeout(Duration::from_secs(config.embedding.timeout_seconds))
                .with_retry_attempts(1);
            debug!("Using Ollama embeddings with model {}", client.model());
            Ok(Arc::new(client))
        }
        EmbeddingBackend::Hashing => {
            debug!("Using hashing embeddings ({} dimensions)", dimension);
            Ok(Arc::new(HashingEmbedder::new(dimension)?))
        }
    }
}

async fn build_store(config: &Config) -> Result<Arc<dyn VectorStore>> {
    let dimension = config.embedding.embedding_dimension as usize;
    match config.store.backend {
        StoreBackend::Lance => {
            let path = config.vector_database_path();
            let store = LanceVectorStore::open(&path, &config.store.table, dimension).await?;
            info!("Opened vector store at {}", path.display());
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            debug!("Using in-memory vector store");
            Ok(Arc::new(InMemoryVectorStore::new(dimension)))
        }
    }
}
