//! Embeds the parsed corpus and assembles the exact-search index bundle.
//!
//! Skips the build entirely when the bundle directory already exists —
//! the bundle is rebuilt wholesale, never patched, so delete the
//! directory to rebuild from scratch.
//!
//! ```bash
//! FATWASEARCH_DATA_DIR=./fatwa_data FATWASEARCH_INDEX_DIR=./fatwa_index \
//!     cargo run --bin build_index
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fatwasearch::embedding::{
    BatcherConfig, CheckpointStore, EmbeddingBatcher, EmbeddingProvider, MockEmbeddingProvider,
    RemoteEmbeddingProvider,
};
use fatwasearch::index::{IndexBundle, documents_from_records};
use fatwasearch::ingestion::corpus::CorpusStore;
use fatwasearch::ingestion::fetch::build_client;
use fatwasearch::lockfile::WorkDirLock;
use fatwasearch::types::FatwaError;
use tracing_subscriber::FmtSubscriber;
use url::Url;

#[tokio::main]
async fn main() -> Result<(), FatwaError> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let data_dir = env::var("FATWASEARCH_DATA_DIR").unwrap_or_else(|_| "./fatwa_data".to_string());
    let index_dir = env::var("FATWASEARCH_INDEX_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./fatwa_index"));
    let vectors_path = env::var("FATWASEARCH_VECTORS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./fatwa_embeddings.f32"));
    let batch_size = env::var("FATWASEARCH_EMBED_BATCH")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(12);
    let checkpoint_interval = env::var("FATWASEARCH_CHECKPOINT_INTERVAL")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(50);

    if index_dir.exists() {
        println!(
            "Index bundle already exists at {}; delete it to rebuild.",
            index_dir.display()
        );
        return Ok(());
    }

    let store = CorpusStore::new(&data_dir);
    let _lock = WorkDirLock::acquire(store.data_dir())?;

    let records = store.load_records().await?;
    let documents = documents_from_records(&records);
    println!(
        "Loaded {} records ({} embeddable, {} failed or partial)",
        records.len(),
        documents.len(),
        records.len() - documents.len()
    );
    let texts: Vec<String> = documents.iter().map(|doc| doc.page_content.clone()).collect();

    let provider = provider_from_env()?;
    let checkpoints = CheckpointStore::new(store.data_dir());
    let batcher = EmbeddingBatcher::new(
        provider,
        checkpoints,
        BatcherConfig {
            batch_size,
            checkpoint_interval,
        },
    );

    let start = Instant::now();
    let matrix = batcher.embed_all(&texts).await?;

    // Final artifact first, then the checkpoint is redundant and dropped.
    matrix.write_to(&vectors_path).await?;
    let bundle = IndexBundle::build(matrix, documents)?;
    bundle.save(&index_dir).await?;
    batcher.checkpoints().clear().await?;

    println!("\n✅ Index build complete!");
    println!("  documents  : {}", bundle.len());
    println!("  dimension  : {}", bundle.dimensions());
    println!("  vectors    : {}", vectors_path.display());
    println!("  bundle     : {}", index_dir.display());
    println!("  duration   : {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}

/// A remote endpoint when configured, the deterministic mock otherwise.
fn provider_from_env() -> Result<Arc<dyn EmbeddingProvider>, FatwaError> {
    match env::var("FATWASEARCH_EMBED_URL") {
        Ok(endpoint) => {
            let endpoint =
                Url::parse(&endpoint).map_err(|err| FatwaError::Config(err.to_string()))?;
            let model = env::var("FATWASEARCH_EMBED_MODEL")
                .unwrap_or_else(|_| "intfloat/multilingual-e5-large".to_string());
            let dims = env::var("FATWASEARCH_EMBED_DIMS")
                .ok()
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(1024);
            Ok(Arc::new(RemoteEmbeddingProvider::new(
                build_client()?,
                endpoint,
                model,
                dims,
            )))
        }
        Err(_) => Ok(Arc::new(MockEmbeddingProvider::new())),
    }
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
