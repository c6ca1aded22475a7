use super::*;
use crate::store::content_hash;
use tempfile::TempDir;

fn record(vector: Vec<f32>, text: &str, file_name: &str) -> NewRecord {
    let mut metadata = Metadata::new();
    metadata.insert("file_name".to_string(), file_name.to_string());
    metadata.insert(CONTENT_HASH_KEY.to_string(), content_hash(text));
    NewRecord {
        vector,
        text: text.to_string(),
        metadata,
    }
}

async fn open_store(temp_dir: &TempDir, dimension: usize) -> LanceVectorStore {
    LanceVectorStore::open(&temp_dir.path().join("vectors"), "embeddings", dimension)
        .await
        .expect("should open vector store")
}

#[tokio::test]
async fn vector_store_initialization() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = open_store(&temp_dir, 5).await;

    assert_eq!(store.dimension(), 5);
    assert_eq!(store.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn store_and_search_embeddings() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = open_store(&temp_dir, 3).await;

    store
        .add(vec![
            record(vec![0.0, 1.0, 0.0], "unrelated", "a.pdf"),
            record(vec![0.9, 0.1, 0.0], "close", "b.pdf"),
        ])
        .await
        .expect("should store records");
    let ids = store
        .add(vec![record(vec![1.0, 0.0, 0.0], "exact", "c.pdf")])
        .await
        .expect("should store records");

    assert_eq!(store.count().await.expect("should count"), 3);

    let results = store
        .query(&[1.0, 0.0, 0.0], 2)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, ids[0]);
    assert_eq!(results[0].text, "exact");
    assert_eq!(results[0].metadata["file_name"], "c.pdf");
    assert!((results[0].score - 1.0).abs() < 1e-4);
    assert!(results[0].score >= results[1].score);
    assert_eq!(results[1].text, "close");
}

#[tokio::test]
async fn search_on_empty_store_returns_nothing() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = open_store(&temp_dir, 3).await;

    let results = store
        .query(&[1.0, 0.0, 0.0], 5)
        .await
        .expect("search should succeed");
    assert!(results.is_empty());
}

#[tokio::test]
async fn zero_vectors_score_zero() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = open_store(&temp_dir, 3).await;

    store
        .add(vec![
            record(vec![0.0, 0.0, 0.0], "   ", "blank.pdf"),
            record(vec![1.0, 0.0, 0.0], "exact", "c.pdf"),
        ])
        .await
        .expect("should store records");

    let results = store
        .query(&[1.0, 0.0, 0.0], 2)
        .await
        .expect("search should succeed");
    assert!(results.iter().all(|r| r.score.is_finite()));
    assert_eq!(results[0].text, "exact");
    assert!((results[0].score - 1.0).abs() < 1e-4);
    for result in results.iter().filter(|r| r.text == "   ") {
        assert_eq!(result.score, 0.0);
    }

    let results = store
        .query(&[0.0, 0.0, 0.0], 2)
        .await
        .expect("search should succeed");
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.score == 0.0));
}

#[test]
fn non_finite_distance_scores_zero() {
    assert_eq!(score_from_distance(Some(f32::NAN)), 0.0);
    assert_eq!(score_from_distance(None), 0.0);
    assert!((score_from_distance(Some(0.25)) - 0.75).abs() < 1e-6);
}

#[tokio::test]
async fn dimension_mismatch_rejected_without_writing() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = open_store(&temp_dir, 3).await;

    let result = store
        .add(vec![
            record(vec![1.0, 0.0, 0.0], "fine", "a.pdf"),
            record(vec![1.0, 0.0], "short", "a.pdf"),
        ])
        .await;
    assert!(matches!(result, Err(RagError::DimensionMismatch { .. })));
    assert_eq!(store.count().await.expect("should count"), 0);

    let result = store.query(&[1.0, 0.0], 1).await;
    assert!(matches!(result, Err(RagError::DimensionMismatch { .. })));
}

#[tokio::test]
async fn reopening_with_other_dimension_fails() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    {
        let store = open_store(&temp_dir, 3).await;
        store
            .add(vec![record(vec![1.0, 0.0, 0.0], "kept", "a.pdf")])
            .await
            .expect("should store records");
    }

    let reopened = open_store(&temp_dir, 3).await;
    assert_eq!(reopened.count().await.expect("should count"), 1);

    let result =
        LanceVectorStore::open(&temp_dir.path().join("vectors"), "embeddings", 4).await;
    assert!(matches!(
        result,
        Err(RagError::DimensionMismatch {
            expected: 4,
            actual: 3
        })
    ));
}

#[tokio::test]
async fn optimize_keeps_records_searchable() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = open_store(&temp_dir, 3).await;

    for text in ["one", "two", "three"] {
        store
            .add(vec![record(vec![1.0, 0.0, 0.0], text, "a.pdf")])
            .await
            .expect("should store records");
    }

    store.optimize().await.expect("optimize should succeed");

    assert_eq!(store.count().await.expect("should count"), 3);
    let results = store
        .query(&[1.0, 0.0, 0.0], 3)
        .await
        .expect("search should succeed");
    assert_eq!(results.len(), 3);
}

#[tokio::test]
async fn content_hash_lookup() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = open_store(&temp_dir, 3).await;

    store
        .add(vec![record(vec![1.0, 0.0, 0.0], "hashed text", "a.pdf")])
        .await
        .expect("should store records");

    assert!(
        store
            .contains_content_hash(&content_hash("hashed text"))
            .await
            .expect("lookup should succeed")
    );
    assert!(
        !store
            .contains_content_hash(&content_hash("missing"))
            .await
            .expect("lookup should succeed")
    );
    assert!(
        !store
            .contains_content_hash("' OR 1=1 --")
            .await
            .expect("lookup should succeed")
    );
}
