use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Embedding failure: {0}")]
    EmbeddingFailure(String),

    #[error("Chat completion failure: {0}")]
    ChatCompletionFailure(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// Transient failures of an external capability. Callers may retry these
    /// with backoff; everything else is fatal to the operation.
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::EmbeddingFailure(_) | Self::ChatCompletionFailure(_)
        )
    }
}

pub mod chain;
pub mod chat;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod ingest;
pub mod loader;
pub mod pipeline;
pub mod retriever;
pub mod retry;
pub mod splitter;
pub mod store;

#[cfg(feature = "bench")]
pub mod internal {
    pub use crate::splitter;
}
