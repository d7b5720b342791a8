use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Tuning for one sync run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Where artifacts and key files are staged. `None` uses the platform
    /// temp directory.
    pub scratch_dir: Option<PathBuf>,
    /// Channel on the target that transferred packages are promoted into.
    pub destination_channel: String,
    /// Packages (with their dependency chains) transferred at once.
    /// `1` keeps the pass strictly serial.
    pub package_concurrency: usize,
    /// Keys replicated at once per origin.
    pub key_concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            destination_channel: "stable".into(),
            package_concurrency: 1,
            key_concurrency: 4,
        }
    }
}

impl SyncConfig {
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }
}
