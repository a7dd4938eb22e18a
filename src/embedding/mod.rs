//! Embedding providers and the vector matrix they fill.
//!
//! The embedding function is an opaque, possibly slow capability: text in,
//! fixed-dimension vector out.  [`MockEmbeddingProvider`] is the
//! deterministic stand-in used by tests and demos;
//! [`RemoteEmbeddingProvider`] talks to an OpenAI-compatible embeddings
//! endpoint.

pub mod batcher;
pub mod checkpoint;

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::fs;
use url::Url;

use crate::types::FatwaError;

pub use batcher::{BatcherConfig, EmbeddingBatcher};
pub use checkpoint::{Checkpoint, CheckpointStore};

/// Text-in, fixed-dimension-vector-out capability.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Declared output dimension; every returned vector must honor it.
    fn dimensions(&self) -> usize;

    /// Embeds a batch of documents, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, FatwaError>;
}

// ── Matrix ─────────────────────────────────────────────────────────────

/// Row-major matrix of embedding vectors.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    data: Vec<f32>,
    rows: usize,
    dims: usize,
}

impl Matrix {
    /// Pre-allocated zero-filled matrix; rows beyond the frontier are
    /// filler and must never be read as real data.
    pub fn zeros(rows: usize, dims: usize) -> Self {
        Self {
            data: vec![0.0; rows * dims],
            rows,
            dims,
        }
    }

    /// Wraps raw row-major data, validating the shape.
    pub fn from_raw(data: Vec<f32>, dims: usize) -> Result<Self, FatwaError> {
        if dims == 0 || !data.len().is_multiple_of(dims) {
            return Err(FatwaError::Config(format!(
                "{} values do not form rows of dimension {dims}",
                data.len()
            )));
        }
        let rows = data.len() / dims;
        Ok(Self { data, rows, dims })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.dims..(index + 1) * self.dims]
    }

    pub(crate) fn row_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.data[index * self.dims..(index + 1) * self.dims]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Writes the matrix as raw little-endian `f32` values.
    pub async fn write_to(&self, path: &Path) -> Result<(), FatwaError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(path, encode_f32s(&self.data)).await?;
        Ok(())
    }

    /// Reads a raw little-endian `f32` file, inferring the row count from
    /// the declared dimension.
    pub async fn read_from(path: &Path, dims: usize) -> Result<Self, FatwaError> {
        let bytes = fs::read(path).await?;
        Self::from_raw(decode_f32s(&bytes)?, dims)
    }
}

pub(crate) fn encode_f32s(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

pub(crate) fn decode_f32s(bytes: &[u8]) -> Result<Vec<f32>, FatwaError> {
    if !bytes.len().is_multiple_of(4) {
        return Err(FatwaError::Checkpoint(format!(
            "vector file length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

// ── Providers ──────────────────────────────────────────────────────────

/// Deterministic hash-based embedder for tests and offline demos.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dims: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dims: 8 }
    }

    #[must_use]
    pub fn with_dimensions(dims: usize) -> Self {
        Self { dims }
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, FatwaError> {
        Ok(texts
            .iter()
            .map(|text| hash_to_vec(text, self.dims))
            .collect())
    }
}

fn hash_to_vec(text: &str, dims: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..dims)
        .map(|i| {
            let bits = seed.rotate_left((i * 8) as u32) ^ ((i as u64) << 24);
            (bits as f64 / u32::MAX as f64) as f32
        })
        .collect()
}

/// Talks to an OpenAI-compatible `/embeddings` endpoint.
#[derive(Clone, Debug)]
pub struct RemoteEmbeddingProvider {
    client: Client,
    endpoint: Url,
    model: String,
    dims: usize,
}

impl RemoteEmbeddingProvider {
    pub fn new(client: Client, endpoint: Url, model: impl Into<String>, dims: usize) -> Self {
        Self {
            client,
            endpoint,
            model: model.into(),
            dims,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, FatwaError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FatwaError::Embedding(format!(
                "embedding endpoint answered {status}"
            )));
        }
        let parsed: EmbeddingResponse = response.json().await?;
        if parsed.data.len() != texts.len() {
            return Err(FatwaError::Embedding(format!(
                "endpoint returned {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }
        Ok(parsed.data.into_iter().map(|row| row.embedding).collect())
    }
}
