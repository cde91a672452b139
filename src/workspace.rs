//! The per-run directory that holds generated coverage profiles.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::Result;

const PREFIX: &str = "deltacov-";

/// A process-private temporary directory. It is removed only when
/// [`remove`](ProfileDir::remove) is called or the value is dropped;
/// [`keep`](ProfileDir::keep) leaves it on disk for inspection.
#[derive(Debug)]
pub struct ProfileDir {
    dir: TempDir,
}

impl ProfileDir {
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(PREFIX).tempdir()?;
        tracing::debug!(path = %dir.path().display(), "created profile directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Delete the directory and everything in it.
    pub fn remove(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }

    /// Leave the directory on disk and return its path.
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }
}
