//! Queries a built index bundle from the command line.
//!
//! ```bash
//! cargo run --bin search -- "نماز میں سورہ فاتحہ" 5
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use fatwasearch::embedding::{EmbeddingProvider, MockEmbeddingProvider, RemoteEmbeddingProvider};
use fatwasearch::index::IndexBundle;
use fatwasearch::ingestion::fetch::build_client;
use fatwasearch::types::FatwaError;
use tracing_subscriber::FmtSubscriber;
use url::Url;

#[tokio::main]
async fn main() -> Result<(), FatwaError> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let mut args = env::args().skip(1);
    let query = args
        .next()
        .ok_or_else(|| FatwaError::Config("usage: search <query> [k]".to_string()))?;
    let k = args
        .next()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(5);

    let index_dir = env::var("FATWASEARCH_INDEX_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./fatwa_index"));

    let bundle = IndexBundle::load(&index_dir).await?;
    println!(
        "Loaded bundle: {} documents, dimension {}",
        bundle.len(),
        bundle.dimensions()
    );

    let provider = provider_from_env(bundle.dimensions())?;
    let query_vector = provider
        .embed_batch(std::slice::from_ref(&query))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| FatwaError::Embedding("empty embedding response".to_string()))?;

    for (rank, (document, distance)) in bundle.search(&query_vector, k)?.iter().enumerate() {
        println!("\n#{} (distance {distance:.4})", rank + 1);
        if let Some(category) = &document.category {
            println!("  category : {category}");
        }
        println!("  url      : {}", document.url);
        let preview: String = document.page_content.chars().take(160).collect();
        println!("  {preview}…");
    }
    Ok(())
}

/// Must match the provider the bundle was built with, or distances are
/// meaningless.
fn provider_from_env(dims: usize) -> Result<Arc<dyn EmbeddingProvider>, FatwaError> {
    match env::var("FATWASEARCH_EMBED_URL") {
        Ok(endpoint) => {
            let endpoint =
                Url::parse(&endpoint).map_err(|err| FatwaError::Config(err.to_string()))?;
            let model = env::var("FATWASEARCH_EMBED_MODEL")
                .unwrap_or_else(|_| "intfloat/multilingual-e5-large".to_string());
            Ok(Arc::new(RemoteEmbeddingProvider::new(
                build_client()?,
                endpoint,
                model,
                dims,
            )))
        }
        Err(_) => Ok(Arc::new(MockEmbeddingProvider::with_dimensions(dims))),
    }
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
