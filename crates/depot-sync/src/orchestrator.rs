use std::sync::Arc;

use depot_client::RegistryClient;
use depot_types::SyncScope;
use tracing::{info, info_span, warn, Instrument};

use crate::cancel::CancelToken;
use crate::catalog::CatalogLister;
use crate::config::SyncConfig;
use crate::diff::SetDiffer;
use crate::error::SyncResult;
use crate::existence::ExistenceCache;
use crate::keys::KeySyncer;
use crate::pool::run_bounded;
use crate::scratch::ScratchDir;
use crate::transfer::TransferPipeline;
use crate::types::{ChannelReport, KeySyncReport, PackageOutcome, SyncReport, TransferStatus};

/// Drives one sync run across all configured origins and channels.
pub struct Orchestrator {
    upstream: Arc<dyn RegistryClient>,
    target: Arc<dyn RegistryClient>,
    scopes: Vec<SyncScope>,
    config: SyncConfig,
    cancel: CancelToken,
}

impl Orchestrator {
    pub fn new(
        upstream: Arc<dyn RegistryClient>,
        target: Arc<dyn RegistryClient>,
        scopes: Vec<SyncScope>,
        config: SyncConfig,
    ) -> Self {
        Self { upstream, target, scopes, config, cancel: CancelToken::new() }
    }

    /// Use an externally owned token, e.g. one tripped by a signal handler.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Keys for every origin, then one package pass per origin and channel.
    ///
    /// Only setup problems (an unusable scratch directory) are errors; every
    /// failure after that lands in the report.
    pub async fn run(&self) -> SyncResult<SyncReport> {
        let scratch = self.prepare_scratch().await?;
        let mut report = SyncReport::begin();
        let span = info_span!("sync", run_id = %report.run_id);

        async {
            info!(
                upstream = self.upstream.name(),
                target = self.target.name(),
                origins = self.scopes.len(),
                "starting sync"
            );
            report.keys = self.sync_keys(&scratch).await;

            let existence = Arc::new(ExistenceCache::new());
            let pipeline = TransferPipeline::new(
                self.upstream.clone(),
                self.target.clone(),
                existence,
                scratch.clone(),
                self.config.destination_channel.clone(),
                self.cancel.clone(),
            );

            'scopes: for scope in &self.scopes {
                for channel in &scope.channels {
                    if self.cancel.is_cancelled() {
                        warn!("cancellation requested; skipping remaining channels");
                        break 'scopes;
                    }
                    let pass = self.sync_channel(&pipeline, &scope.name, channel).await;
                    report.channels.push(pass);
                }
            }

            report.cancelled = self.cancel.is_cancelled();
            report.finish();
            info!(
                transferred = report.transferred(),
                skipped = report.skipped(),
                failed = report.failed(),
                keys_imported = report.keys_imported(),
                outcome = %report.outcome(),
                "sync finished"
            );
        }
        .instrument(span)
        .await;

        Ok(report)
    }

    /// Replicate signing keys only; no packages are touched.
    pub async fn sync_keys_only(&self) -> SyncResult<SyncReport> {
        let scratch = self.prepare_scratch().await?;
        let mut report = SyncReport::begin();
        let span = info_span!("sync_keys", run_id = %report.run_id);
        report.keys = self.sync_keys(&scratch).instrument(span).await;
        report.cancelled = self.cancel.is_cancelled();
        report.finish();
        Ok(report)
    }

    async fn prepare_scratch(&self) -> SyncResult<ScratchDir> {
        let scratch = ScratchDir::from_config(&self.config);
        scratch.ensure().await?;
        Ok(scratch)
    }

    async fn sync_keys(&self, scratch: &ScratchDir) -> Vec<KeySyncReport> {
        let syncer = KeySyncer::new(
            self.upstream.clone(),
            self.target.clone(),
            scratch.clone(),
            self.config.key_concurrency,
            self.cancel.clone(),
        );
        let mut reports = Vec::with_capacity(self.scopes.len());
        for scope in &self.scopes {
            if self.cancel.is_cancelled() {
                break;
            }
            reports.push(syncer.sync(&scope.name).await);
        }
        reports
    }

    /// One `origin/channel` package pass.
    async fn sync_channel(
        &self,
        pipeline: &TransferPipeline,
        origin: &str,
        channel: &str,
    ) -> ChannelReport {
        let mut report = ChannelReport::new(origin, channel);
        let upstream = CatalogLister::new(self.upstream.clone());
        let target = CatalogLister::new(self.target.clone());

        let (upstream_catalog, target_catalog) =
            tokio::join!(upstream.list_all(origin, channel), target.list_all_or_empty(origin, channel));
        let (upstream_catalog, target_catalog) = match (upstream_catalog, target_catalog) {
            (Ok(u), Ok(t)) => (u, t),
            (Err(e), _) | (_, Err(e)) => {
                warn!(origin, channel, error = %e, "skipping channel");
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.upstream_count = upstream_catalog.len();
        report.target_count = target_catalog.len();

        let missing = SetDiffer::difference(&upstream_catalog.data, &target_catalog.data);
        report.missing = missing.len();
        info!(
            origin,
            channel,
            upstream = report.upstream_count,
            target = report.target_count,
            missing = report.missing,
            "diffed catalogs"
        );

        let total = missing.len();
        let results = run_bounded(
            missing.iter().cloned().enumerate().collect::<Vec<_>>(),
            self.config.package_concurrency,
            |(i, ident)| {
                let pipeline = pipeline.clone();
                async move {
                    info!(package = %ident, "Package [{}/{}]", i + 1, total);
                    pipeline.transfer(&ident).await
                }
            },
        )
        .await;

        for (ident, result) in missing.into_iter().zip(results) {
            let outcome = result.unwrap_or_else(|e| {
                let mut failed = PackageOutcome::new(ident.clone());
                failed.push(ident, TransferStatus::Failed { reason: e.to_string() });
                failed
            });
            report.packages.push(outcome);
        }
        report
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("upstream", &self.upstream.name())
            .field("target", &self.target.name())
            .field("scopes", &self.scopes)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{dir_entries, dyn_client, ident, key, pair, publish, record};
    use crate::types::RunOutcome;
    use depot_client::{endpoints, ClientError, ClientResult, InMemoryRegistry};
    use depot_types::{CatalogPage, OriginKey, PackageIdent, PackageRecord};
    use std::path::Path;
    use tempfile::TempDir;

    fn orchestrator(
        upstream: &Arc<InMemoryRegistry>,
        target: &Arc<InMemoryRegistry>,
        channels: &[&str],
        dir: &TempDir,
    ) -> Orchestrator {
        Orchestrator::new(
            dyn_client(upstream),
            dyn_client(target),
            vec![SyncScope::new("core", channels.iter().copied())],
            SyncConfig::default().with_scratch_dir(dir.path()),
        )
    }

    /// Upstream {A(deps B), B, C}, target {C}.
    fn abc() -> (Arc<InMemoryRegistry>, Arc<InMemoryRegistry>) {
        let (upstream, target) = pair();
        publish(&upstream, "c", &[]);
        publish(&upstream, "b", &[]);
        publish(&upstream, "a", &["b"]);
        publish(&target, "c", &[]);
        (upstream, target)
    }

    #[tokio::test]
    async fn end_to_end_mirrors_missing_packages() {
        let (upstream, target) = abc();
        let dir = tempfile::tempdir().unwrap();

        let report = orchestrator(&upstream, &target, &["stable"], &dir).run().await.unwrap();

        assert_eq!(report.outcome(), RunOutcome::FullySynced);
        let mut on_target = target.channel_idents("core", "stable");
        on_target.sort();
        assert_eq!(on_target, vec![ident("a"), ident("b"), ident("c")]);
        // b moves on its own turn and is then found present as a's dependency
        assert_eq!(target.stats().uploads, 2);
        assert_eq!(report.channels[0].missing, 2);
        assert_eq!(report.transferred(), 2);
        assert_eq!(dir_entries(dir.path()), 0);
        assert!(report.finished_at.is_some());
    }

    #[tokio::test]
    async fn dependency_lands_before_dependent() {
        let (upstream, target) = pair();
        publish(&upstream, "a", &["b"]);
        publish(&upstream, "b", &[]);
        let dir = tempfile::tempdir().unwrap();

        orchestrator(&upstream, &target, &["stable"], &dir).run().await.unwrap();

        assert_eq!(target.channel_idents("core", "stable"), vec![ident("b"), ident("a")]);
    }

    #[tokio::test]
    async fn second_run_moves_nothing() {
        let (upstream, target) = abc();
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&upstream, &target, &["stable"], &dir);

        orch.run().await.unwrap();
        let downloads = upstream.stats().downloads;
        let uploads = target.stats().uploads;
        let report = orch.run().await.unwrap();

        assert_eq!(upstream.stats().downloads, downloads);
        assert_eq!(target.stats().uploads, uploads);
        assert_eq!(report.channels[0].missing, 0);
        assert_eq!(report.outcome(), RunOutcome::FullySynced);
    }

    #[tokio::test]
    async fn failed_listing_does_not_stop_other_channels() {
        let (upstream, target) = abc();
        upstream.publish(record("d", &[]), b"artifact-d".to_vec(), &["unstable"]);
        upstream.fail_listing("core", "stable");
        let dir = tempfile::tempdir().unwrap();

        let report = orchestrator(&upstream, &target, &["stable", "unstable"], &dir)
            .run()
            .await
            .unwrap();

        assert_eq!(report.channels.len(), 2);
        assert!(report.channels[0].error.is_some());
        assert!(report.channels[1].error.is_none());
        assert!(target.contains(&ident("d")));
        assert_eq!(report.outcome(), RunOutcome::PartiallySynced);
    }

    #[tokio::test]
    async fn every_channel_failing_aborts() {
        let (upstream, target) = abc();
        target.fail_listing("core", "stable");
        let dir = tempfile::tempdir().unwrap();

        let report = orchestrator(&upstream, &target, &["stable"], &dir).run().await.unwrap();

        assert_eq!(report.outcome(), RunOutcome::Aborted);
        assert_eq!(upstream.stats().downloads, 0);
    }

    #[tokio::test]
    async fn broken_package_is_isolated() {
        let (upstream, target) = abc();
        upstream.fail_record(&ident("a"));
        let dir = tempfile::tempdir().unwrap();

        let report = orchestrator(&upstream, &target, &["stable"], &dir).run().await.unwrap();

        assert_eq!(report.failed(), 1);
        assert!(target.contains(&ident("b")));
        assert!(!target.contains(&ident("a")));
        assert_eq!(report.outcome(), RunOutcome::PartiallySynced);
    }

    #[tokio::test]
    async fn keys_sync_before_packages() {
        let (upstream, target) = abc();
        upstream.add_key(key("1"), "material-1");
        let dir = tempfile::tempdir().unwrap();

        let report = orchestrator(&upstream, &target, &["stable"], &dir).run().await.unwrap();

        assert_eq!(report.keys.len(), 1);
        assert_eq!(report.keys_imported(), 1);
        assert_eq!(target.key_revisions("core"), vec!["1"]);
    }

    #[tokio::test]
    async fn key_failure_does_not_block_packages() {
        let (upstream, target) = abc();
        upstream.fail_key_listing("core");
        let dir = tempfile::tempdir().unwrap();

        let report = orchestrator(&upstream, &target, &["stable"], &dir).run().await.unwrap();

        assert!(report.keys[0].error.is_some());
        assert!(target.contains(&ident("a")));
        assert_eq!(report.outcome(), RunOutcome::PartiallySynced);
    }

    #[tokio::test]
    async fn keys_only_touches_no_packages() {
        let (upstream, target) = abc();
        upstream.add_key(key("1"), "material-1");
        let dir = tempfile::tempdir().unwrap();

        let report = orchestrator(&upstream, &target, &["stable"], &dir)
            .sync_keys_only()
            .await
            .unwrap();

        assert_eq!(report.keys_imported(), 1);
        assert!(report.channels.is_empty());
        assert_eq!(upstream.stats().list_calls, 0);
    }

    #[tokio::test]
    async fn cancelled_run_is_aborted() {
        let (upstream, target) = abc();
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&upstream, &target, &["stable"], &dir);
        orch.cancel_token().cancel();

        let report = orch.run().await.unwrap();

        assert!(report.cancelled);
        assert!(report.channels.is_empty());
        assert_eq!(report.outcome(), RunOutcome::Aborted);
        assert_eq!(upstream.stats().downloads, 0);
    }

    #[tokio::test]
    async fn concurrent_passes_match_serial() {
        let (upstream, target) = pair();
        publish(&upstream, "zlib", &[]);
        for name in ["a", "b", "c", "d"] {
            publish(&upstream, name, &["zlib"]);
        }
        let dir = tempfile::tempdir().unwrap();
        let mut config = SyncConfig::default().with_scratch_dir(dir.path());
        config.package_concurrency = 3;
        let orch = Orchestrator::new(
            dyn_client(&upstream),
            dyn_client(&target),
            vec![SyncScope::new("core", ["stable"])],
            config,
        );

        let report = orch.run().await.unwrap();

        assert_eq!(report.outcome(), RunOutcome::FullySynced);
        assert_eq!(target.stats().uploads, 5);
        assert_eq!(target.channel_idents("core", "stable").len(), 5);
    }

    /// Target depot that has never heard of any channel.
    struct NoChannels(Arc<InMemoryRegistry>);

    #[async_trait::async_trait]
    impl RegistryClient for NoChannels {
        fn name(&self) -> &str {
            "target"
        }
        async fn list_packages(
            &self,
            origin: &str,
            channel: &str,
            _range: Option<u64>,
        ) -> ClientResult<CatalogPage> {
            Err(ClientError::NotFound(endpoints::channel_packages(origin, channel)))
        }
        async fn fetch_package(&self, ident: &PackageIdent) -> ClientResult<PackageRecord> {
            self.0.fetch_package(ident).await
        }
        async fn package_exists(&self, ident: &PackageIdent) -> ClientResult<bool> {
            self.0.package_exists(ident).await
        }
        async fn download_artifact(&self, record: &PackageRecord, dest: &Path) -> ClientResult<u64> {
            self.0.download_artifact(record, dest).await
        }
        async fn upload_artifact(&self, record: &PackageRecord, src: &Path, channel: &str) -> ClientResult<()> {
            self.0.upload_artifact(record, src, channel).await
        }
        async fn list_origin_keys(&self, origin: &str) -> ClientResult<Vec<OriginKey>> {
            self.0.list_origin_keys(origin).await
        }
        async fn fetch_key(&self, key: &OriginKey) -> ClientResult<String> {
            self.0.fetch_key(key).await
        }
        async fn import_key(&self, key: &OriginKey, src: &Path) -> ClientResult<()> {
            self.0.import_key(key, src).await
        }
    }

    #[tokio::test]
    async fn channel_absent_on_target_is_mirrored() {
        let (upstream, target) = pair();
        upstream.publish(record("app", &[]), b"artifact-app".to_vec(), &["LTS-2024"]);
        let dir = tempfile::tempdir().unwrap();
        let orch = Orchestrator::new(
            dyn_client(&upstream),
            Arc::new(NoChannels(target.clone())),
            vec![SyncScope::new("core", ["LTS-2024"])],
            SyncConfig::default().with_scratch_dir(dir.path()),
        );

        let report = orch.run().await.unwrap();

        assert!(report.channels[0].error.is_none());
        assert_eq!(report.channels[0].target_count, 0);
        assert_eq!(report.channels[0].missing, 1);
        assert!(target.contains(&ident("app")));
        assert_eq!(report.outcome(), RunOutcome::FullySynced);
    }

    #[tokio::test]
    async fn channel_absent_upstream_is_still_an_error() {
        let (upstream, target) = pair();
        let dir = tempfile::tempdir().unwrap();
        let orch = Orchestrator::new(
            Arc::new(NoChannels(upstream.clone())),
            dyn_client(&target),
            vec![SyncScope::new("core", ["LTS-2024"])],
            SyncConfig::default().with_scratch_dir(dir.path()),
        );

        let report = orch.run().await.unwrap();

        assert!(report.channels[0].error.is_some());
        assert_eq!(report.outcome(), RunOutcome::Aborted);
    }

    #[test]
    fn debug_names_both_depots() {
        let (upstream, target) = pair();
        let dir = tempfile::tempdir().unwrap();
        let text = format!("{:?}", orchestrator(&upstream, &target, &["stable"], &dir));
        assert!(text.contains("\"upstream\""));
        assert!(text.contains("\"target\""));
        assert!(text.contains("stable"));
    }
}
