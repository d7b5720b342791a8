use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::SyncResult;

/// Local directory where artifacts and key files are staged in transit.
#[derive(Clone, Debug)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The configured directory, or the platform temp directory.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.scratch_dir.clone().unwrap_or_else(std::env::temp_dir))
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist yet.
    pub async fn ensure(&self) -> SyncResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Reserve a file in the directory. Nothing is created on disk; the
    /// returned guard removes whatever ends up at its path.
    pub fn file(&self, name: &str) -> ScratchFile {
        ScratchFile { path: self.root.join(sanitize(name)), removed: false }
    }
}

/// Path separators in remote-supplied names become `_`.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect()
}

/// A staged file that is deleted when the guard is removed or dropped.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    removed: bool,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now.
    pub async fn remove(mut self) {
        self.removed = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(file = %self.path.display(), "removed scratch file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(file = %self.path.display(), error = %e, "failed to remove scratch file"),
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(file = %self.path.display(), "removed scratch file on drop"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(file = %self.path.display(), error = %e, "failed to remove scratch file"),
        }
    }
}
