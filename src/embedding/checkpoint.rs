//! On-disk checkpoint for partially generated embedding matrices.
//!
//! The store owns exactly two files: the zero-padded matrix and the
//! frontier index.  Rows `[0, frontier)` are valid vectors; rows beyond
//! are filler.  Writes always land matrix-first, frontier-second, so a
//! reader never observes a frontier pointing past valid data.  The
//! checkpoint is superseded by the final vector artifact on successful
//! completion and deleted via [`CheckpointStore::clear`].

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::embedding::{Matrix, decode_f32s, encode_f32s};
use crate::types::FatwaError;

const MATRIX_FILE: &str = "embeddings_checkpoint.f32";
const FRONTIER_FILE: &str = "embeddings_checkpoint.frontier";

/// A resumable snapshot of the embedding pass.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    pub matrix: Matrix,
    pub frontier: usize,
}

/// Explicit owner of the checkpoint files for one corpus directory.
#[derive(Clone, Debug)]
pub struct CheckpointStore {
    matrix_path: PathBuf,
    frontier_path: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            matrix_path: dir.join(MATRIX_FILE),
            frontier_path: dir.join(FRONTIER_FILE),
        }
    }

    pub fn matrix_path(&self) -> &Path {
        &self.matrix_path
    }

    /// `true` when a resumable snapshot is present on disk.
    pub fn exists(&self) -> bool {
        self.matrix_path.exists() && self.frontier_path.exists()
    }

    /// Loads the snapshot when both files are present, validating it
    /// against the expected corpus shape.  A shape mismatch means the
    /// checkpoint belongs to a different corpus snapshot and must be
    /// cleared by hand — never silently patched.
    pub async fn load(&self, rows: usize, dims: usize) -> Result<Option<Checkpoint>, FatwaError> {
        if !self.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&self.matrix_path).await?;
        let values = decode_f32s(&bytes)?;
        if values.len() != rows * dims {
            return Err(FatwaError::Checkpoint(format!(
                "checkpoint holds {} values but the corpus needs {} ({rows}x{dims}); \
                 delete {} to rebuild",
                values.len(),
                rows * dims,
                self.matrix_path.display()
            )));
        }
        let matrix = Matrix::from_raw(values, dims)?;

        let frontier_text = fs::read_to_string(&self.frontier_path).await?;
        let frontier: usize = frontier_text.trim().parse().map_err(|_| {
            FatwaError::Checkpoint(format!(
                "frontier file {} is corrupt",
                self.frontier_path.display()
            ))
        })?;
        if frontier > rows {
            return Err(FatwaError::Checkpoint(format!(
                "frontier {frontier} points past the corpus ({rows} rows)"
            )));
        }

        Ok(Some(Checkpoint { matrix, frontier }))
    }

    /// Persists the snapshot: matrix first, then the frontier.
    pub async fn save(&self, matrix: &Matrix, frontier: usize) -> Result<(), FatwaError> {
        if let Some(parent) = self.matrix_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(&self.matrix_path, encode_f32s(matrix.as_slice())).await?;
        fs::write(&self.frontier_path, frontier.to_string()).await?;
        Ok(())
    }

    /// Removes both files; absence is not an error.
    pub async fn clear(&self) -> Result<(), FatwaError> {
        for path in [&self.matrix_path, &self.frontier_path] {
            match fs::remove_file(path).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn absent_files_mean_fresh_start() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        assert!(!store.exists());
        assert!(store.load(4, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn snapshot_round_trips() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());

        let mut matrix = Matrix::zeros(3, 2);
        matrix.row_mut(0).copy_from_slice(&[1.0, 2.0]);
        matrix.row_mut(1).copy_from_slice(&[3.0, 4.0]);
        store.save(&matrix, 2).await.unwrap();

        let snapshot = store.load(3, 2).await.unwrap().unwrap();
        assert_eq!(snapshot.frontier, 2);
        assert_eq!(snapshot.matrix, matrix);
        assert_eq!(snapshot.matrix.row(2), &[0.0, 0.0]);
    }

    #[tokio::test]
    async fn shape_mismatch_is_fatal() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store.save(&Matrix::zeros(3, 2), 2).await.unwrap();

        match store.load(5, 2).await {
            Err(FatwaError::Checkpoint(_)) => {}
            other => panic!("expected checkpoint error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn frontier_past_corpus_is_fatal() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store.save(&Matrix::zeros(3, 2), 7).await.unwrap();

        match store.load(3, 2).await {
            Err(FatwaError::Checkpoint(_)) => {}
            other => panic!("expected checkpoint error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn clear_removes_both_files_idempotently() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store.save(&Matrix::zeros(1, 1), 0).await.unwrap();
        assert!(store.exists());

        store.clear().await.unwrap();
        assert!(!store.exists());
        store.clear().await.unwrap();
    }
}
