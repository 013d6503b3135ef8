//! Scratch working directory for one xtb run.
//!
//! Each invocation gets its own directory under the scratch root, so several
//! GRRM jobs can share one root without locking. The directory is removed
//! only by [`WorkDir::finish`], i.e. after the job succeeded; a failed job
//! leaves it behind with `xtblog.log` for inspection.

use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while managing the working directory.
#[derive(Error, Debug)]
pub enum WorkDirError {
    /// The directory could not be created
    #[error("Failed to create working directory {}: {source}", .path.display())]
    Create {
        /// Directory that was attempted
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
    /// The directory could not be removed
    #[error("Failed to remove working directory {}: {source}", .path.display())]
    Remove {
        /// Directory that was attempted
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Result type for working-directory operations
pub type Result<T> = std::result::Result<T, WorkDirError>;

/// A created working directory.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    /// Creates `scratch_root/name`, including missing parents.
    pub fn create(scratch_root: &Path, name: &str) -> Result<Self> {
        let path = scratch_root.join(name);
        fs::create_dir_all(&path).map_err(|source| WorkDirError::Create {
            path: path.clone(),
            source,
        })?;
        debug!("Created working directory: {}", path.display());
        Ok(Self { path })
    }

    /// Path of the directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the directory unless `keep` is set.
    pub fn finish(self, keep: bool) -> Result<()> {
        if keep {
            info!("Keeping working directory: {}", self.path.display());
            return Ok(());
        }
        if !self.path.exists() {
            warn!("Working directory already gone: {}", self.path.display());
            return Ok(());
        }
        fs::remove_dir_all(&self.path).map_err(|source| WorkDirError::Remove {
            path: self.path.clone(),
            source,
        })?;
        debug!("Removed working directory: {}", self.path.display());
        Ok(())
    }
}
