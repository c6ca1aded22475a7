
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{CONTENT_HASH_KEY, NewRecord, ScoredRecord, StoredRecord, VectorStore, cosine_similarity};
use crate::Result;
use crate::embeddings::check_dimension;

/// Vector store kept entirely in process memory.
///
/// Each `add` takes the write lock once, so a batch becomes visible to
/// queries all at once.
#[derive(Debug)]
pub struct InMemoryVectorStore {
    dimension: usize,
    records: RwLock<Vec<StoredRecord>>,
}

impl InMemoryVectorStore {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of every stored record in insertion order
    #[inline]
    pub async fn records(&self) -> Vec<StoredRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    async fn add(&self, records: Vec<NewRecord>) -> Result<Vec<String>> {
        for record in &records {
            check_dimension(self.dimension, &record.vector)?;
        }

        let stored: Vec<StoredRecord> = records
            .into_iter()
            .map(|record| StoredRecord {
                id: Uuid::new_v4().to_string(),
                vector: record.vector,
                text: record.text,
                metadata: record.metadata,
            })
            .collect();
        let ids = stored.iter().map(|r| r.id.clone()).collect();

        let mut guard = self.records.write().await;
        guard.extend(stored);
        debug!("In-memory store now holds {} records", guard.len());

        Ok(ids)
    }

    #[inline]
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>> {
        check_dimension(self.dimension, vector)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let guard = self.records.read().await;
        let mut scored: Vec<(f32, &StoredRecord)> = guard
            .iter()
            .map(|record| (cosine_similarity(vector, &record.vector), record))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, record)| ScoredRecord {
                id: record.id.clone(),
                text: record.text.clone(),
                metadata: record.metadata.clone(),
                score,
            })
            .collect())
    }

    #[inline]
    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }

    #[inline]
    async fn contains_content_hash(&self, hash: &str) -> Result<bool> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .any(|r| r.metadata.get(CONTENT_HASH_KEY).is_some_and(|h| h == hash)))
    }
}
