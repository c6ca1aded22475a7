#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use tracing::{debug, info};
use uuid::Uuid;

use super::{CONTENT_HASH_KEY, NewRecord, ScoredRecord, VectorStore};
use crate::embeddings::check_dimension;
use crate::splitter::Metadata;
use crate::{RagError, Result};

/// Vector store persisted on disk with LanceDB
pub struct LanceVectorStore {
    table: Table,
    table_name: String,
    dimension: usize,
}

fn unavailable(action: &str, error: impl std::fmt::Display) -> RagError {
    RagError::StoreUnavailable(format!("Failed to {}: {}", action, error))
}

impl LanceVectorStore {
    /// Open (or create) the store under `path`.
    ///
    /// An existing table whose vector column has a different dimension is
    /// rejected with [`RagError::DimensionMismatch`].
    #[inline]
    pub async fn open(path: &Path, table_name: &str, dimension: usize) -> Result<Self> {
        debug!("Initializing LanceDB at path: {:?}", path);

        std::fs::create_dir_all(path).map_err(|e| {
            RagError::StoreUnavailable(format!(
                "Failed to create vector database directory: {}",
                e
            ))
        })?;

        let uri = path.to_string_lossy().to_string();
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| unavailable("connect to LanceDB", e))?;

        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| unavailable("list tables", e))?;

        let table = if table_names.iter().any(|name| name == table_name) {
            let table = connection
                .open_table(table_name)
                .execute()
                .await
                .map_err(|e| unavailable("open table", e))?;
            let existing = Self::detect_vector_dimension(&table).await?;
            if existing != dimension {
                return Err(RagError::DimensionMismatch {
                    expected: dimension,
                    actual: existing,
                });
            }
            debug!("Opened existing table '{}' ({} dimensions)", table_name, existing);
            table
        } else {
            info!(
                "Creating table '{}' with {} dimensions",
                table_name, dimension
            );
            connection
                .create_empty_table(table_name, create_schema(dimension))
                .execute()
                .await
                .map_err(|e| unavailable("create table", e))?
        };

        Ok(Self {
            table,
            table_name: table_name.to_string(),
            dimension,
        })
    }

    async fn detect_vector_dimension(table: &Table) -> Result<usize> {
        let schema = table
            .schema()
            .await
            .map_err(|e| unavailable("read table schema", e))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(RagError::StoreUnavailable(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    fn create_record_batch(&self, ids: &[String], records: &[NewRecord]) -> Result<RecordBatch> {
        let created_at = Utc::now().to_rfc3339();

        let mut flat_values = Vec::with_capacity(records.len() * self.dimension);
        let mut texts = Vec::with_capacity(records.len());
        let mut metadata = Vec::with_capacity(records.len());
        let mut hashes = Vec::with_capacity(records.len());

        for record in records {
            flat_values.extend_from_slice(&record.vector);
            texts.push(record.text.as_str());
            metadata.push(serde_json::to_string(&record.metadata).map_err(|e| {
                RagError::Other(anyhow::anyhow!("Failed to serialize metadata: {}", e))
            })?);
            hashes.push(record.metadata.get(CONTENT_HASH_KEY).map(String::as_str));
        }

        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.dimension as i32,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| unavailable("build vector array", e))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids.to_vec())),
            Arc::new(vector_array),
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(metadata)),
            Arc::new(StringArray::from(hashes)),
            Arc::new(StringArray::from(vec![created_at.as_str(); records.len()])),
        ];

        RecordBatch::try_new(create_schema(self.dimension), arrays)
            .map_err(|e| unavailable("build record batch", e))
    }
}

/// Schema with the vector column fixed to `vector_dim`
fn create_schema(vector_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                vector_dim as i32,
            ),
            false,
        ),
        Field::new("text", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new("content_hash", DataType::Utf8, true),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::StoreUnavailable(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::StoreUnavailable(format!("Invalid {} column type", name)))
}

/// Cosine distance is 1 - similarity. A zero vector on either side yields
/// NaN, which scores 0 like the in-memory store. Plain scans carry no
/// distance and score 0 as well.
fn score_from_distance(distance: Option<f32>) -> f32 {
    match distance {
        Some(distance) if distance.is_finite() => 1.0 - distance,
        _ => 0.0,
    }
}

/// Parse a single record batch of search results
fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<ScoredRecord>> {
    let ids = string_column(batch, "id")?;
    let texts = string_column(batch, "text")?;
    let metadata = string_column(batch, "metadata")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut results = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let metadata: Metadata = serde_json::from_str(metadata.value(row)).map_err(|e| {
            RagError::StoreUnavailable(format!("Corrupt metadata for record: {}", e))
        })?;

        let distance = distances.and_then(|d| (!d.is_null(row)).then(|| d.value(row)));

        results.push(ScoredRecord {
            id: ids.value(row).to_string(),
            text: texts.value(row).to_string(),
            metadata,
            score: score_from_distance(distance),
        });
    }

    Ok(results)
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    async fn add(&self, records: Vec<NewRecord>) -> Result<Vec<String>> {
        if records.is_empty() {
            debug!("No records to store");
            return Ok(Vec::new());
        }
        for record in &records {
            check_dimension(self.dimension, &record.vector)?;
        }

        let ids: Vec<String> = records.iter().map(|_| Uuid::new_v4().to_string()).collect();
        let batch = self.create_record_batch(&ids, &records)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);

        // A single add is a single commit
        self.table
            .add(reader)
            .execute()
            .await
            .map_err(|e| unavailable("insert records", e))?;

        debug!("Stored {} records in '{}'", ids.len(), self.table_name);
        Ok(ids)
    }

    #[inline]
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>> {
        check_dimension(self.dimension, vector)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        // Nothing is similar to a zero vector, so any top_k records will do
        let mut stream = if vector.iter().all(|value| *value == 0.0) {
            debug!("Zero query vector, scanning without ranking");
            self.table
                .query()
                .limit(top_k)
                .execute()
                .await
                .map_err(|e| unavailable("execute scan", e))?
        } else {
            self.table
                .vector_search(vector)
                .map_err(|e| unavailable("create vector search", e))?
                .column("vector")
                .distance_type(DistanceType::Cosine)
                .limit(top_k)
                .execute()
                .await
                .map_err(|e| unavailable("execute search", e))?
        };

        let mut results = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| unavailable("read result stream", e))?
        {
            results.extend(parse_search_batch(&batch)?);
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        debug!("Vector search returned {} results", results.len());
        Ok(results)
    }

    #[inline]
    async fn count(&self) -> Result<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| unavailable("count rows", e))
    }

    #[inline]
    async fn contains_content_hash(&self, hash: &str) -> Result<bool> {
        // Hashes are hex, so they are safe to inline in the predicate
        if !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(false);
        }
        let matches = self
            .table
            .count_rows(Some(format!("content_hash = '{}'", hash)))
            .await
            .map_err(|e| unavailable("look up content hash", e))?;
        Ok(matches > 0)
    }

    /// Compact the table's data files
    #[inline]
    async fn optimize(&self) -> Result<()> {
        self.table
            .optimize(lancedb::table::OptimizeAction::All)
            .await
            .map_err(|e| unavailable("optimize table", e))?;
        info!("Vector database optimization completed");
        Ok(())
    }
}
