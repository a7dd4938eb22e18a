//! Durable persistence for parsed records and crawl progress.
//!
//! The corpus lives in one JSON array that is rewritten wholesale on each
//! persist; the progress ledger is a sibling JSON object read once at
//! startup to compute the resume offset.  Records are immutable once
//! written and unique per identifier — re-persisting a list containing a
//! duplicate keeps the first occurrence.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::types::FatwaError;

/// One scraped document.  A record with `error` set is still data — it is
/// persisted for auditing and excluded from embedding, never dropped.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedRecord {
    pub url: String,
    pub question: Option<String>,
    pub answer: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl ParsedRecord {
    /// `true` when the record carries usable question/answer text.
    pub fn is_parsed(&self) -> bool {
        self.error.is_none() && self.question.is_some() && self.answer.is_some()
    }
}

/// Crawl progress written after each persisted batch.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ProgressLedger {
    pub processed: usize,
    pub total: usize,
    pub percentage: f64,
}

impl ProgressLedger {
    pub fn new(processed: usize, total: usize) -> Self {
        let percentage = if total > 0 {
            processed as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self {
            processed,
            total,
            percentage,
        }
    }
}

/// Append-only record store plus progress ledger for one corpus directory.
#[derive(Clone, Debug)]
pub struct CorpusStore {
    data_dir: PathBuf,
    records_path: PathBuf,
    ledger_path: PathBuf,
}

impl CorpusStore {
    /// Creates a store rooted at the provided directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let records_path = data_dir.join("raw_fatwas.json");
        let ledger_path = data_dir.join("progress.json");
        Self {
            data_dir,
            records_path,
            ledger_path,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn records_path(&self) -> &Path {
        &self.records_path
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    /// Loads all persisted records; an absent file is an empty corpus.
    pub async fn load_records(&self) -> Result<Vec<ParsedRecord>, FatwaError> {
        if !self.records_path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.records_path).await?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Rewrites the record file wholesale, enforcing identifier uniqueness
    /// (first occurrence wins).
    pub async fn save_records(&self, records: &[ParsedRecord]) -> Result<(), FatwaError> {
        fs::create_dir_all(&self.data_dir).await?;
        let mut seen = HashSet::with_capacity(records.len());
        let unique: Vec<&ParsedRecord> = records
            .iter()
            .filter(|record| seen.insert(record.url.as_str()))
            .collect();
        let serialized = serde_json::to_string_pretty(&unique)?;
        fs::write(&self.records_path, serialized).await?;
        Ok(())
    }

    /// Loads the progress ledger; an absent file means a fresh crawl.
    pub async fn load_progress(&self) -> Result<ProgressLedger, FatwaError> {
        if !self.ledger_path.exists() {
            return Ok(ProgressLedger::default());
        }
        let data = fs::read_to_string(&self.ledger_path).await?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Persists the ledger.  Callers only invoke this after a successful
    /// record persist so the resume offset never runs ahead of the data.
    pub async fn save_progress(&self, processed: usize, total: usize) -> Result<(), FatwaError> {
        fs::create_dir_all(&self.data_dir).await?;
        let ledger = ProgressLedger::new(processed, total);
        let serialized = serde_json::to_string_pretty(&ledger)?;
        fs::write(&self.ledger_path, serialized).await?;
        Ok(())
    }
}
