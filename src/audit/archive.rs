//! Durable archive sink for the completed audit log.
//!
//! The real object store is an external collaborator; the core depends
//! only on the `store(name, bytes)` contract. [`FsArchive`] is the
//! directory-backed implementation used by the CLI and tests.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::core::errors::{FdhError, Result};

/// Write-once sink for an archived drill log.
pub trait LogArchive {
    /// Store `bytes` under `name`. Overwrites are the caller's concern;
    /// the orchestrator generates a fresh timestamped name per run.
    fn store(&self, name: &str, bytes: &[u8]) -> Result<()>;
}

/// Archive object name for a drill that started at `started_at`.
#[must_use]
pub fn archive_object_name(started_at: DateTime<Utc>) -> String {
    format!("drill_log_{}.jsonl", started_at.format("%Y%m%d%H%M%S"))
}

/// Filesystem-backed archive: one file per drill under a base directory.
#[derive(Debug, Clone)]
pub struct FsArchive {
    dir: PathBuf,
}

impl FsArchive {
    /// Archive rooted at `dir`; the directory is created on first store.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full path an object with `name` would be stored at.
    #[must_use]
    pub fn object_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl LogArchive for FsArchive {
    fn store(&self, name: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|source| FdhError::io(&self.dir, source))?;
        let path = self.object_path(name);
        fs::write(&path, bytes).map_err(|source| FdhError::ArchiveStore {
            name: name.to_string(),
            details: format!("{}: {source}", path.display()),
        })
    }
}
