//! Resumable crawl over the identifier list.
//!
//! Reads the progress ledger to pick up where the previous run stopped;
//! safe to interrupt and re-run at any time.
//!
//! ```bash
//! FATWASEARCH_DATA_DIR=./fatwa_data cargo run --bin crawl
//! ```

use std::env;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use fatwasearch::ingestion::corpus::CorpusStore;
use fatwasearch::ingestion::fetch::{CrawlClient, build_client};
use fatwasearch::ingestion::orchestrator::{CrawlConfig, CrawlOrchestrator};
use fatwasearch::types::FatwaError;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), FatwaError> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let data_dir = env::var("FATWASEARCH_DATA_DIR").unwrap_or_else(|_| "./fatwa_data".to_string());
    let urls_path = env::var("FATWASEARCH_URLS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./fatwa_urls.json"));
    let batch_size = env::var("FATWASEARCH_BATCH")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(5);
    let delay_ms = env::var("FATWASEARCH_DELAY_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(500);

    let urls: Vec<String> = serde_json::from_str(&tokio::fs::read_to_string(&urls_path).await?)?;
    let store = CorpusStore::new(&data_dir);

    let progress = store.load_progress().await?;
    if progress.processed >= urls.len() && !urls.is_empty() {
        println!("All {} identifiers already processed.", urls.len());
        return Ok(());
    }
    println!(
        "Resuming from index {}/{}",
        progress.processed,
        urls.len()
    );

    let config = CrawlConfig {
        batch_size,
        delay: Duration::from_millis(delay_ms),
        resume_from: progress.processed,
    };
    let orchestrator = CrawlOrchestrator::new(CrawlClient::new(build_client()?), store, config);

    let start = Instant::now();
    let summary = orchestrator.run(&urls).await?;
    let elapsed = start.elapsed();

    println!("\n✅ Crawl complete!");
    println!("  identifiers : {}", summary.total);
    println!("  new records : {}", summary.new_records);
    println!("  failed      : {}", summary.failed);
    println!("  skipped     : {}", summary.skipped);
    println!("  duration    : {:.1}s", elapsed.as_secs_f64());
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
