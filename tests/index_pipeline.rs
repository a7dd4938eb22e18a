//! Embed-and-index pipeline tests with the deterministic mock provider.

use std::sync::Arc;

use chrono::Utc;
use fatwasearch::anchors;
use fatwasearch::embedding::{
    BatcherConfig, CheckpointStore, EmbeddingBatcher, EmbeddingProvider, MockEmbeddingProvider,
};
use fatwasearch::index::{IndexBundle, documents_from_records};
use fatwasearch::ingestion::corpus::ParsedRecord;
use fatwasearch::types::FatwaError;
use tempfile::tempdir;

fn record(slug: &str, question: &str, answer_body: &str) -> ParsedRecord {
    ParsedRecord {
        url: format!("https://www.fatwaqa.com/ur/fatawa/namaz/{slug}"),
        question: Some(question.to_string()),
        answer: Some(format!(
            "{} {answer_body} {}",
            anchors::ANSWER_START,
            anchors::ANSWER_END
        )),
        category: Some("namaz".to_string()),
        error: None,
        scraped_at: Utc::now(),
    }
}

fn failed_record(slug: &str) -> ParsedRecord {
    ParsedRecord {
        url: format!("https://www.fatwaqa.com/ur/fatawa/namaz/{slug}"),
        question: None,
        answer: None,
        category: Some("namaz".to_string()),
        error: Some("anchor `answer-end` not found".to_string()),
        scraped_at: Utc::now(),
    }
}

fn sample_records() -> Vec<ParsedRecord> {
    vec![
        record("one", "کیا نماز واجب ہے؟", "نماز فرض ہے۔"),
        failed_record("broken"),
        record("two", "وضو کے فرائض کیا ہیں؟", "وضو میں چار فرض ہیں۔"),
        record("three", "روزے کی نیت کب تک؟", "صبح صادق سے پہلے۔"),
    ]
}

#[tokio::test]
async fn bundle_preserves_positional_correspondence() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(MockEmbeddingProvider::new());
    let batcher = EmbeddingBatcher::new(
        provider.clone(),
        CheckpointStore::new(dir.path()),
        BatcherConfig::default(),
    );

    let documents = documents_from_records(&sample_records());
    assert_eq!(documents.len(), 3, "failed record must be excluded");

    let texts: Vec<String> = documents.iter().map(|d| d.page_content.clone()).collect();
    let matrix = batcher.embed_all(&texts).await.unwrap();
    let bundle = IndexBundle::build(matrix, documents).unwrap();

    // For every position, the stored vector is the embedding of the stored
    // document.
    for position in 0..bundle.len() {
        let document = bundle.document(position).unwrap();
        let expected = provider
            .embed_batch(std::slice::from_ref(&document.page_content))
            .await
            .unwrap();
        assert_eq!(bundle.vector(position), expected[0].as_slice());
    }
}

#[tokio::test]
async fn saved_bundle_serves_identical_deterministic_queries() {
    let dir = tempdir().unwrap();
    let bundle_dir = dir.path().join("fatwa_index");

    let provider = Arc::new(MockEmbeddingProvider::new());
    let batcher = EmbeddingBatcher::new(
        provider.clone(),
        CheckpointStore::new(dir.path()),
        BatcherConfig::default(),
    );

    let documents = documents_from_records(&sample_records());
    let texts: Vec<String> = documents.iter().map(|d| d.page_content.clone()).collect();
    let matrix = batcher.embed_all(&texts).await.unwrap();
    let bundle = IndexBundle::build(matrix, documents).unwrap();
    bundle.save(&bundle_dir).await.unwrap();

    let loaded = IndexBundle::load(&bundle_dir).await.unwrap();

    let query = provider
        .embed_batch(&["نماز کا حکم".to_string()])
        .await
        .unwrap()
        .remove(0);

    let first: Vec<(String, f32)> = loaded
        .search(&query, 3)
        .unwrap()
        .into_iter()
        .map(|(doc, dist)| (doc.url.clone(), dist))
        .collect();
    for _ in 0..5 {
        let again: Vec<(String, f32)> = loaded
            .search(&query, 3)
            .unwrap()
            .into_iter()
            .map(|(doc, dist)| (doc.url.clone(), dist))
            .collect();
        assert_eq!(first, again);
    }

    // The in-memory bundle and its round-tripped twin agree.
    let direct: Vec<String> = bundle
        .search(&query, 3)
        .unwrap()
        .into_iter()
        .map(|(doc, _)| doc.url.clone())
        .collect();
    let reloaded: Vec<String> = first.into_iter().map(|(url, _)| url).collect();
    assert_eq!(direct, reloaded);
}

#[tokio::test]
async fn record_count_mismatch_aborts_the_build() {
    let dir = tempdir().unwrap();
    let batcher = EmbeddingBatcher::new(
        Arc::new(MockEmbeddingProvider::new()),
        CheckpointStore::new(dir.path()),
        BatcherConfig::default(),
    );

    let documents = documents_from_records(&sample_records());
    let texts: Vec<String> = documents.iter().map(|d| d.page_content.clone()).collect();
    let matrix = batcher.embed_all(&texts).await.unwrap();

    let mut truncated = documents;
    truncated.pop();
    match IndexBundle::build(matrix, truncated) {
        Err(FatwaError::LengthMismatch { vectors, documents }) => {
            assert_eq!(vectors, 3);
            assert_eq!(documents, 2);
        }
        other => panic!("expected length mismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn checkpoint_cleared_after_final_artifact() {
    let dir = tempdir().unwrap();
    let store = CheckpointStore::new(dir.path());
    let batcher = EmbeddingBatcher::new(
        Arc::new(MockEmbeddingProvider::new()),
        store.clone(),
        BatcherConfig {
            batch_size: 1,
            checkpoint_interval: 1,
        },
    );

    let documents = documents_from_records(&sample_records());
    let texts: Vec<String> = documents.iter().map(|d| d.page_content.clone()).collect();
    let matrix = batcher.embed_all(&texts).await.unwrap();
    assert!(store.exists(), "mid-run checkpoints were written");

    let vectors_path = dir.path().join("fatwa_embeddings.f32");
    matrix.write_to(&vectors_path).await.unwrap();
    batcher.checkpoints().clear().await.unwrap();

    assert!(vectors_path.exists());
    assert!(!store.exists(), "checkpoint superseded by the final artifact");
}
