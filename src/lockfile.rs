//! Scoped single-writer lock over a corpus directory.
//!
//! The corpus store, progress ledger, and embedding checkpoint each assume
//! exactly one in-flight writer.  Orchestrator and batcher runs acquire
//! this lock for their whole duration; a second concurrent run against the
//! same directory fails fast instead of corrupting shared files.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::types::FatwaError;

const LOCK_FILE_NAME: &str = ".fatwasearch.lock";

/// Guard holding exclusive ownership of a corpus directory.  The lock file
/// is removed when the guard drops.
#[derive(Debug)]
pub struct WorkDirLock {
    path: PathBuf,
}

impl WorkDirLock {
    /// Acquires the lock, failing fast when another run holds it.
    ///
    /// A stale file left behind by a killed process must be removed by
    /// hand; the error names the path for that reason.
    pub fn acquire(dir: &Path) -> Result<Self, FatwaError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE_NAME);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Self { path })
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(FatwaError::Lock(format!(
                    "{} exists; another run is active (or crashed without cleanup)",
                    path.display()
                )))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkDirLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
