// Ingest module
// Splitter -> embedding -> vector store for batches of documents


use std::collections::HashSet;
use std::sync::Arc;

use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::embeddings::{EmbeddingProvider, check_dimension};
use crate::retry::{Capability, RetryPolicy};
use crate::splitter::{Chunk, Document, DocumentSplitter};
use crate::store::{CONTENT_HASH_KEY, NewRecord, VectorStore, content_hash};
use crate::{RagError, Result};

pub const CHUNK_INDEX_KEY: &str = "chunk_index";
pub const START_OFFSET_KEY: &str = "start_offset";
pub const END_OFFSET_KEY: &str = "end_offset";

/// Which chunks to skip when ingesting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Store every chunk, even if identical text is already stored
    #[default]
    None,
    /// Skip chunks whose text hash is already stored or was seen earlier in
    /// the same document
    ContentHash,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestConfig {
    pub dedup: DedupPolicy,
    /// Documents processed at the same time
    pub concurrency: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            dedup: DedupPolicy::None,
            concurrency: 4,
        }
    }
}

/// A document that could not be ingested
#[derive(Debug)]
pub struct DocumentFailure {
    pub source: String,
    pub error: RagError,
}

/// Outcome of ingesting one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentOutcome {
    pub stored: usize,
    pub skipped_duplicates: usize,
}

/// Outcome of an ingest run. Failed documents are listed here instead of
/// aborting the run.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub documents: usize,
    pub stored: usize,
    pub skipped_duplicates: usize,
    pub failures: Vec<DocumentFailure>,
}

impl IngestReport {
    /// True when every document was ingested
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    #[inline]
    pub fn succeeded(&self) -> usize {
        self.documents - self.failures.len()
    }
}

pub struct Ingestor {
    splitter: DocumentSplitter,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    config: IngestConfig,
    retry: RetryPolicy,
}

impl Ingestor {
    /// Fails with [`RagError::DimensionMismatch`] when the embedder and the
    /// store disagree on the vector dimension
    #[inline]
    pub fn new(
        splitter: DocumentSplitter,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        if embedder.dimension() != store.dimension() {
            return Err(RagError::DimensionMismatch {
                expected: store.dimension(),
                actual: embedder.dimension(),
            });
        }

        Ok(Self {
            splitter,
            embedder,
            store,
            config: IngestConfig::default(),
            retry: RetryPolicy::default(),
        })
    }

    #[inline]
    pub fn with_config(mut self, config: IngestConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[inline]
    pub const fn config(&self) -> IngestConfig {
        self.config
    }

    /// Ingest documents concurrently. A failing document is recorded in the
    /// report and does not stop the others.
    #[inline]
    pub async fn ingest(&self, documents: &[Document]) -> IngestReport {
        info!(
            "Ingesting {} documents (concurrency {}, dedup {:?})",
            documents.len(),
            self.config.concurrency,
            self.config.dedup
        );

        let outcomes: Vec<(String, Result<DocumentOutcome>)> = stream::iter(documents)
            .map(|document| async move {
                (
                    document.source().to_string(),
                    self.ingest_document(document).await,
                )
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut report = IngestReport {
            documents: documents.len(),
            ..IngestReport::default()
        };

        for (source, outcome) in outcomes {
            match outcome {
                Ok(outcome) => {
                    report.stored += outcome.stored;
                    report.skipped_duplicates += outcome.skipped_duplicates;
                }
                Err(error) => {
                    warn!("Failed to ingest {}: {}", source, error);
                    report.failures.push(DocumentFailure { source, error });
                }
            }
        }

        // Stored records are already committed, so a failed compaction is not fatal
        if report.stored > 0 {
            if let Err(error) = self.store.optimize().await {
                warn!("Failed to optimize vector store after ingest: {}", error);
            }
        }

        info!(
            "Ingest finished: {} records stored, {} duplicates skipped, {} documents failed",
            report.stored,
            report.skipped_duplicates,
            report.failures.len()
        );

        report
    }

    /// Split, embed and store a single document
    #[inline]
    pub async fn ingest_document(&self, document: &Document) -> Result<DocumentOutcome> {
        let chunks = self.splitter.split(document);
        if chunks.is_empty() {
            debug!("{} has no text to ingest", document.source());
            return Ok(DocumentOutcome::default());
        }

        let total = chunks.len();
        let chunks = self.apply_dedup(chunks).await?;
        let skipped_duplicates = total - chunks.len();

        if chunks.is_empty() {
            debug!(
                "All {} chunks of {} are already stored",
                total,
                document.source()
            );
            return Ok(DocumentOutcome {
                stored: 0,
                skipped_duplicates,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|(chunk, _)| chunk.text.clone()).collect();
        let embedder = &self.embedder;
        let texts_ref = &texts;
        let embeddings = self
            .retry
            .run(Capability::Embedding, move || embedder.embed_batch(texts_ref))
            .await?;

        if embeddings.len() != texts.len() {
            return Err(RagError::EmbeddingFailure(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        let records = chunks
            .into_iter()
            .zip(embeddings)
            .map(|((chunk, hash), vector)| {
                check_dimension(self.store.dimension(), &vector)?;
                Ok(build_record(&chunk, hash, vector))
            })
            .collect::<Result<Vec<_>>>()?;

        let store = &self.store;
        let records_ref = &records;
        let ids = self
            .retry
            .run(Capability::Store, move || store.add(records_ref.clone()))
            .await?;

        debug!("Stored {} chunks from {}", ids.len(), document.source());

        Ok(DocumentOutcome {
            stored: ids.len(),
            skipped_duplicates,
        })
    }

    async fn apply_dedup<'a>(&self, chunks: Vec<Chunk<'a>>) -> Result<Vec<(Chunk<'a>, String)>> {
        let hashed = chunks.into_iter().map(|chunk| {
            let hash = content_hash(&chunk.text);
            (chunk, hash)
        });

        if self.config.dedup == DedupPolicy::None {
            return Ok(hashed.collect());
        }

        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for (chunk, hash) in hashed {
            if !seen.insert(hash.clone()) {
                continue;
            }

            let store = &self.store;
            let hash_ref = &hash;
            let exists = self
                .retry
                .run(Capability::Store, move || store.contains_content_hash(hash_ref))
                .await?;
            if !exists {
                kept.push((chunk, hash));
            }
        }

        Ok(kept)
    }
}

fn build_record(chunk: &Chunk<'_>, hash: String, vector: Vec<f32>) -> NewRecord {
    let mut metadata = chunk.metadata.clone();
    metadata.insert(CHUNK_INDEX_KEY.to_string(), chunk.index.to_string());
    metadata.insert(START_OFFSET_KEY.to_string(), chunk.start.to_string());
    metadata.insert(END_OFFSET_KEY.to_string(), chunk.end.to_string());
    metadata.insert(CONTENT_HASH_KEY.to_string(), hash);

    NewRecord {
        vector,
        text: chunk.text.clone(),
        metadata,
    }
}
