use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use depot_client::RegistryConfig;
use depot_sync::SyncConfig;
use depot_types::SyncScope;
use serde::Deserialize;

/// The mirror configuration file.
///
/// ```toml
/// temp_dir = "/var/tmp/depot-mirror"
///
/// [upstream]
/// url = "https://bldr.example.com"
///
/// [target]
/// url = "https://depot.internal"
/// auth_token = "..."
///
/// [[origins]]
/// name = "core"
/// channels = ["stable"]
/// ```
#[derive(Debug, Deserialize)]
pub struct MirrorConfig {
    pub upstream: RegistryConfig,
    pub target: RegistryConfig,
    #[serde(default, alias = "tempDir")]
    pub temp_dir: Option<PathBuf>,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub origins: Vec<SyncScope>,
}

impl MirrorConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: MirrorConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Engine settings with the top-level `temp_dir` applied.
    pub fn sync_config(&self) -> SyncConfig {
        let mut sync = self.sync.clone();
        if let Some(dir) = &self.temp_dir {
            sync.scratch_dir = Some(dir.clone());
        }
        sync
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.origins.is_empty() {
            bail!("no origins configured");
        }
        for scope in &self.origins {
            if scope.name.is_empty() {
                bail!("origin with empty name");
            }
            if scope.channels.is_empty() {
                bail!("origin {} has no channels", scope.name);
            }
        }
        Ok(())
    }
}
