//! Fixed-size batch embedding with resumable checkpoints.

use std::sync::Arc;

use tracing::info;

use crate::embedding::checkpoint::CheckpointStore;
use crate::embedding::{EmbeddingProvider, Matrix};
use crate::types::FatwaError;

/// Tuning knobs for one embedding pass.
#[derive(Clone, Copy, Debug)]
pub struct BatcherConfig {
    /// Documents per provider call.
    pub batch_size: usize,
    /// Persist a checkpoint once at least this many rows have been filled
    /// since the previous one.  An interval that is not a multiple of the
    /// batch size still triggers at the first batch boundary past it.
    pub checkpoint_interval: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 12,
            checkpoint_interval: 50,
        }
    }
}

/// Fills the embedding matrix in fixed-size batches, resuming at the
/// checkpoint frontier when a snapshot is present.
pub struct EmbeddingBatcher {
    provider: Arc<dyn EmbeddingProvider>,
    checkpoints: CheckpointStore,
    config: BatcherConfig,
}

impl EmbeddingBatcher {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        checkpoints: CheckpointStore,
        config: BatcherConfig,
    ) -> Self {
        Self {
            provider,
            checkpoints,
            config,
        }
    }

    /// Embeds every document, returning the completed matrix.
    ///
    /// On success the checkpoint files are still on disk; the caller writes
    /// the final vector artifact and then discards them via
    /// [`CheckpointStore::clear`], so an interruption between the two never
    /// loses the finished pass.  A provider returning vectors of the wrong
    /// dimension aborts the run — that is a configuration failure, not a
    /// per-record one.
    pub async fn embed_all(&self, texts: &[String]) -> Result<Matrix, FatwaError> {
        let dims = self.provider.dimensions();
        let rows = texts.len();

        let (mut matrix, mut next_index) = match self.checkpoints.load(rows, dims).await? {
            Some(snapshot) => {
                info!(
                    frontier = snapshot.frontier,
                    total = rows,
                    "resuming embedding pass from checkpoint"
                );
                (snapshot.matrix, snapshot.frontier)
            }
            None => {
                info!(total = rows, dims, "starting fresh embedding pass");
                (Matrix::zeros(rows, dims), 0)
            }
        };

        let mut since_checkpoint = 0usize;
        while next_index < rows {
            let end = (next_index + self.config.batch_size).min(rows);
            let batch = &texts[next_index..end];
            let vectors = self.provider.embed_batch(batch).await?;
            if vectors.len() != batch.len() {
                return Err(FatwaError::Embedding(format!(
                    "provider returned {} vectors for {} inputs",
                    vectors.len(),
                    batch.len()
                )));
            }

            for (offset, vector) in vectors.iter().enumerate() {
                if vector.len() != dims {
                    return Err(FatwaError::Dimension {
                        expected: dims,
                        actual: vector.len(),
                    });
                }
                matrix.row_mut(next_index + offset).copy_from_slice(vector);
            }

            since_checkpoint += end - next_index;
            next_index = end;

            if since_checkpoint >= self.config.checkpoint_interval && next_index < rows {
                self.checkpoints.save(&matrix, next_index).await?;
                since_checkpoint = 0;
                info!(frontier = next_index, total = rows, "checkpoint persisted");
            }
        }

        info!(rows, dims, "embedding pass complete");
        Ok(matrix)
    }

    /// The checkpoint store backing this batcher.
    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }
}
