use std::sync::Arc;

use depot_client::RegistryClient;
use depot_types::{PackageIdent, PackageRecord};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::error::{SyncError, SyncResult};
use crate::existence::ExistenceCache;
use crate::resolver::DependencyResolver;
use crate::scratch::{ScratchDir, ScratchFile};
use crate::types::{PackageOutcome, TransferStatus};

/// Moves one package and its dependency chain from upstream to target.
///
/// Each identity goes download -> scratch file -> upload, after an existence
/// check on the target. Dependencies go first, in resolver order, so a
/// package never lands on the target before what it needs.
#[derive(Clone)]
pub struct TransferPipeline {
    upstream: Arc<dyn RegistryClient>,
    target: Arc<dyn RegistryClient>,
    resolver: DependencyResolver,
    existence: Arc<ExistenceCache>,
    scratch: ScratchDir,
    channel: String,
    cancel: CancelToken,
}

impl TransferPipeline {
    pub fn new(
        upstream: Arc<dyn RegistryClient>,
        target: Arc<dyn RegistryClient>,
        existence: Arc<ExistenceCache>,
        scratch: ScratchDir,
        channel: impl Into<String>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            resolver: DependencyResolver::new(upstream.clone()),
            upstream,
            target,
            existence,
            scratch,
            channel: channel.into(),
            cancel,
        }
    }

    /// Channel on the target that uploads are promoted into.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Transfer `ident` and every dependency the target lacks.
    ///
    /// Never fails as a whole: the outcome records a status per identity
    /// attempted. The chain stops at the first failure and `ident` is then
    /// reported failed with the dependency's reason.
    pub async fn transfer(&self, ident: &PackageIdent) -> PackageOutcome {
        let mut outcome = PackageOutcome::new(ident.clone());
        if self.cancel.is_cancelled() {
            outcome.push(ident.clone(), TransferStatus::Cancelled);
            return outcome;
        }

        let (record, deps) = match self.resolver.resolve_with_record(ident).await {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(package = %ident, error = %e, "could not resolve dependencies");
                outcome.push(ident.clone(), TransferStatus::Failed { reason: e.to_string() });
                return outcome;
            }
        };

        let total = deps.len();
        for (i, dep) in deps.iter().enumerate() {
            info!(package = %ident, dependency = %dep, "Dependency [{}/{}]", i + 1, total);
            match self.transfer_one(dep, None).await {
                Ok(status) => outcome.push(dep.clone(), status),
                Err(SyncError::Cancelled) => {
                    outcome.push(dep.clone(), TransferStatus::Cancelled);
                    return outcome;
                }
                Err(e) => {
                    warn!(package = %ident, dependency = %dep, error = %e, "dependency transfer failed");
                    let reason = format!("dependency {dep} failed: {e}");
                    outcome.push(dep.clone(), TransferStatus::Failed { reason: e.to_string() });
                    outcome.push(ident.clone(), TransferStatus::Failed { reason });
                    return outcome;
                }
            }
        }

        let status = match self.transfer_one(ident, Some(record)).await {
            Ok(status) => status,
            Err(SyncError::Cancelled) => TransferStatus::Cancelled,
            Err(e) => {
                warn!(package = %ident, error = %e, "package transfer failed");
                TransferStatus::Failed { reason: e.to_string() }
            }
        };
        outcome.push(ident.clone(), status);
        outcome
    }

    /// One identity, holding its lock so a shared dependency moves once.
    async fn transfer_one(
        &self,
        ident: &PackageIdent,
        record: Option<PackageRecord>,
    ) -> SyncResult<TransferStatus> {
        self.cancel.check()?;
        let _held = self.existence.lock(ident).await;

        if self.existence.exists(self.target.as_ref(), ident).await? {
            debug!(package = %ident, "exists in target, skipping download");
            return Ok(TransferStatus::AlreadyPresent);
        }
        self.cancel.check()?;

        let record = match record {
            Some(record) => record,
            None => self.upstream.fetch_package(ident).await?,
        };
        let file = self.scratch.file(&record.artifact_file_name());
        let moved = self.move_artifact(&record, &file).await;
        file.remove().await;
        let bytes = moved?;

        self.existence.mark_present(ident);
        info!(package = %ident, bytes, channel = %self.channel, "uploaded to target");
        Ok(TransferStatus::Transferred { bytes })
    }

    async fn move_artifact(&self, record: &PackageRecord, file: &ScratchFile) -> SyncResult<u64> {
        debug!(package = %record.ident, file = %file.path().display(), "downloading");
        let bytes = self.upstream.download_artifact(record, file.path()).await?;
        self.cancel.check()?;
        self.target.upload_artifact(record, file.path(), &self.channel).await?;
        Ok(bytes)
    }
}
