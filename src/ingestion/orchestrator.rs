//! Resumable, rate-limited crawl loop over the identifier list.
//!
//! Each identifier moves through `pending → fetching → parsed | failed`;
//! the run as a whole is idle until [`CrawlOrchestrator::run`] starts and
//! ends completed (or effectively paused, when interrupted — the last
//! persisted batch is always the recovery point).  A failed document never
//! aborts the run: the failure is captured as a record with `error` set
//! and the loop continues, because one bad page must not lose progress on
//! the rest.  Progress is only advanced after a successful persist, so a
//! crash between fetch and persist re-processes at most one batch, and the
//! store's identifier uniqueness makes that reprocessing idempotent.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use url::Url;

use crate::ingestion::corpus::{CorpusStore, ParsedRecord};
use crate::ingestion::fetch::CrawlClient;
use crate::lockfile::WorkDirLock;
use crate::types::FatwaError;

/// Tuning knobs for one crawl run.
#[derive(Clone, Copy, Debug)]
pub struct CrawlConfig {
    /// Persist records and ledger after this many newly processed
    /// identifiers.
    pub batch_size: usize,
    /// Fixed sleep between consecutive fetches (not after the last one).
    pub delay: Duration,
    /// Offset into the identifier list where this run resumes.
    pub resume_from: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            delay: Duration::from_secs(1),
            resume_from: 0,
        }
    }
}

/// Counts reported after every completed run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Identifiers in the supplied list.
    pub total: usize,
    /// Records newly appended by this run.
    pub new_records: usize,
    /// Newly appended records that carry an error.
    pub failed: usize,
    /// Identifiers skipped because the store already holds them.
    pub skipped: usize,
}

/// Drives the crawl client over an ordered identifier list.
pub struct CrawlOrchestrator {
    client: CrawlClient,
    store: CorpusStore,
    config: CrawlConfig,
}

impl CrawlOrchestrator {
    pub fn new(client: CrawlClient, store: CorpusStore, config: CrawlConfig) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    /// Processes every identifier not yet present in the corpus store,
    /// strictly in input order.  Safe to re-run over the full list at any
    /// time.
    pub async fn run(&self, identifiers: &[String]) -> Result<RunSummary, FatwaError> {
        let _lock = WorkDirLock::acquire(self.store.data_dir())?;

        let mut all_records = self.store.load_records().await?;
        let existing: HashSet<&str> = all_records.iter().map(|r| r.url.as_str()).collect();

        let start = self.config.resume_from.min(identifiers.len());
        let queue: Vec<&String> = identifiers[start..]
            .iter()
            .filter(|url| !existing.contains(url.as_str()))
            .collect();
        let skipped = identifiers.len() - start - queue.len();
        drop(existing);

        let mut summary = RunSummary {
            total: identifiers.len(),
            skipped,
            ..RunSummary::default()
        };

        if queue.is_empty() {
            info!(total = identifiers.len(), "no new identifiers to process");
            return Ok(summary);
        }

        info!(
            total = identifiers.len(),
            pending = queue.len(),
            resume_from = start,
            "starting crawl"
        );

        for (done, url) in queue.iter().enumerate() {
            let position = done + 1;
            info!(%url, position, pending = queue.len(), "fetching");

            let record = self.scrape_one(url).await;
            if record.error.is_some() {
                summary.failed += 1;
            }
            all_records.push(record);
            summary.new_records += 1;

            if position % self.config.batch_size == 0 || position == queue.len() {
                self.store.save_records(&all_records).await?;
                self.store
                    .save_progress(start + position, identifiers.len())
                    .await?;
                info!(position, pending = queue.len(), "progress persisted");
            }

            if position < queue.len() {
                tokio::time::sleep(self.config.delay).await;
            }
        }

        info!(
            new = summary.new_records,
            failed = summary.failed,
            skipped = summary.skipped,
            "crawl completed"
        );
        Ok(summary)
    }

    /// Fetches and parses one identifier, converting any failure into a
    /// record with `error` set.
    async fn scrape_one(&self, url: &str) -> ParsedRecord {
        match self.client.scrape(url).await {
            Ok(fields) => ParsedRecord {
                url: url.to_string(),
                question: Some(fields.question),
                answer: Some(fields.answer),
                category: category_from_url(url),
                error: None,
                scraped_at: Utc::now(),
            },
            Err(err) => {
                warn!(%url, error = %err, "scrape failed");
                ParsedRecord {
                    url: url.to_string(),
                    question: None,
                    answer: None,
                    category: category_from_url(url),
                    error: Some(err.to_string()),
                    scraped_at: Utc::now(),
                }
            }
        }
    }
}

/// Category is the URL path segment following `fatawa`.
pub fn category_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?;
    segments.find(|segment| *segment == "fatawa")?;
    segments
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
