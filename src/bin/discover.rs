//! Builds the ordered identifier list by walking category listing pages.
//!
//! ```bash
//! FATWASEARCH_BASE_URL=https://www.fatwaqa.com/ur/fatawa cargo run --bin discover
//! ```

use std::env;
use std::path::PathBuf;

use fatwasearch::ingestion::discover::{CATEGORIES, discover_urls};
use fatwasearch::ingestion::fetch::build_client;
use fatwasearch::types::FatwaError;
use tracing_subscriber::FmtSubscriber;
use url::Url;

#[tokio::main]
async fn main() -> Result<(), FatwaError> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let base_url = env::var("FATWASEARCH_BASE_URL")
        .unwrap_or_else(|_| "https://www.fatwaqa.com/ur/fatawa".to_string());
    let base_url = Url::parse(&base_url).map_err(|err| FatwaError::Config(err.to_string()))?;

    let output = env::var("FATWASEARCH_URLS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./fatwa_urls.json"));

    let client = build_client()?;
    let urls = discover_urls(&client, &base_url, CATEGORIES).await?;

    let serialized = serde_json::to_string_pretty(&urls)?;
    tokio::fs::write(&output, serialized).await?;

    println!("Discovered {} identifiers", urls.len());
    println!("  written to : {}", output.display());
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
