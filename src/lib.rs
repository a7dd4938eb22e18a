//! ```text
//! fatwa_urls.json ──► ingestion::orchestrator ──► ingestion::fetch ──┐
//!        ▲                      │                                    │
//!        │                      │              normalize ◄── content region
//! ingestion::discover           │                  │
//!                               │              anchors::parse
//!                               ▼                  │
//!                        ingestion::corpus ◄───────┘
//!                        (raw_fatwas.json + progress.json)
//!                               │
//!                               ▼
//!                    embedding::EmbeddingBatcher ──► embedding::CheckpointStore
//!                               │
//!                               ▼
//!                    index::IndexBundle (vectors + docstore + position map)
//!                               │
//!                               ▼
//!                    search(query_vector, k) for downstream RAG consumers
//! ```
//!
pub mod anchors;
pub mod embedding;
pub mod index;
pub mod ingestion;
pub mod lockfile;
pub mod normalize;
pub mod types;

pub use embedding::{EmbeddingBatcher, EmbeddingProvider, Matrix, MockEmbeddingProvider};
pub use index::{IndexBundle, StoredDocument};
pub use ingestion::corpus::{CorpusStore, ParsedRecord, ProgressLedger};
pub use ingestion::orchestrator::{CrawlConfig, CrawlOrchestrator, RunSummary};
pub use types::FatwaError;
