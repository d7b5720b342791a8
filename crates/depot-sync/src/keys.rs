use std::sync::Arc;

use depot_client::RegistryClient;
use depot_types::OriginKey;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::diff::SetDiffer;
use crate::error::{SyncError, SyncResult};
use crate::pool::run_bounded;
use crate::scratch::ScratchDir;
use crate::types::{KeyFailure, KeySyncReport};

/// Replicates origin public signing keys the target is missing.
#[derive(Clone)]
pub struct KeySyncer {
    upstream: Arc<dyn RegistryClient>,
    target: Arc<dyn RegistryClient>,
    scratch: ScratchDir,
    concurrency: usize,
    cancel: CancelToken,
}

impl KeySyncer {
    pub fn new(
        upstream: Arc<dyn RegistryClient>,
        target: Arc<dyn RegistryClient>,
        scratch: ScratchDir,
        concurrency: usize,
        cancel: CancelToken,
    ) -> Self {
        Self { upstream, target, scratch, concurrency, cancel }
    }

    /// Import every key revision of `origin` that upstream has and the
    /// target lacks. Failures are recorded in the report, never raised.
    pub async fn sync(&self, origin: &str) -> KeySyncReport {
        let mut report = KeySyncReport::new(origin);

        let (upstream_keys, target_keys) = tokio::join!(
            self.list(self.upstream.as_ref(), origin),
            self.list(self.target.as_ref(), origin),
        );
        let (upstream_keys, target_keys) = match (upstream_keys, target_keys) {
            (Ok(u), Ok(t)) => (u, t),
            (Err(e), _) | (_, Err(e)) => {
                warn!(origin, error = %e, "key listing failed");
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.upstream_count = upstream_keys.len();
        report.target_count = target_keys.len();

        let missing = SetDiffer::difference(&upstream_keys, &target_keys);
        if missing.is_empty() {
            info!(origin, "all keys present on target");
            return report;
        }
        info!(origin, missing = missing.len(), "replicating keys");

        let results = run_bounded(missing.clone(), self.concurrency, |key| {
            let syncer = self.clone();
            async move { syncer.replicate(&key).await }
        })
        .await;

        for (key, result) in missing.into_iter().zip(results) {
            match result.and_then(|r| r) {
                Ok(()) => report.imported.push(key),
                Err(e) => {
                    warn!(key = %key, error = %e, "key import failed");
                    report.failed.push(KeyFailure { key, reason: e.to_string() });
                }
            }
        }
        report
    }

    async fn list(&self, registry: &dyn RegistryClient, origin: &str) -> SyncResult<Vec<OriginKey>> {
        registry.list_origin_keys(origin).await.map_err(|source| SyncError::KeyListing {
            registry: registry.name().to_string(),
            origin: origin.to_string(),
            source,
        })
    }

    /// fetch -> scratch file -> import; the file is removed either way.
    async fn replicate(&self, key: &OriginKey) -> SyncResult<()> {
        self.cancel.check()?;
        let material = self.upstream.fetch_key(key).await?;
        let file = self.scratch.file(&key.file_name());
        let imported = async {
            tokio::fs::write(file.path(), material.as_bytes()).await?;
            self.target.import_key(key, file.path()).await?;
            Ok::<_, SyncError>(())
        }
        .await;
        file.remove().await;
        imported?;
        info!(key = %key, "imported key");
        Ok(())
    }
}
