use std::sync::Arc;

use depot_client::{ClientError, RegistryClient};
use depot_types::CatalogPage;
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};

/// Reads a complete channel listing from one depot, page by page.
#[derive(Clone)]
pub struct CatalogLister {
    registry: Arc<dyn RegistryClient>,
}

impl CatalogLister {
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self { registry }
    }

    /// Every package the depot lists for `origin/channel`.
    ///
    /// The first page fixes the page size and total; the remaining pages are
    /// requested at `i * page_size` for `i` in `1..ceil(total / page_size)`.
    /// Any failed page fails the whole listing: a partial catalog would make
    /// the diff report packages as missing that are not.
    pub async fn list_all(&self, origin: &str, channel: &str) -> SyncResult<CatalogPage> {
        self.list(origin, channel, false).await
    }

    /// Like [`list_all`](Self::list_all), but a channel the depot does not
    /// know (`NotFound` on the first page) is an empty catalog. Used for the
    /// target, where a channel only appears once something is promoted into it.
    pub async fn list_all_or_empty(&self, origin: &str, channel: &str) -> SyncResult<CatalogPage> {
        self.list(origin, channel, true).await
    }

    async fn list(&self, origin: &str, channel: &str, absent_is_empty: bool) -> SyncResult<CatalogPage> {
        let listing_error = |source: ClientError| SyncError::Listing {
            registry: self.registry.name().to_string(),
            origin: origin.to_string(),
            channel: channel.to_string(),
            source,
        };

        let mut catalog = match self.registry.list_packages(origin, channel, None).await {
            Ok(page) => page,
            Err(ClientError::NotFound(url)) if absent_is_empty => {
                debug!(registry = self.registry.name(), origin, channel, %url, "channel absent; treating as empty");
                return Ok(CatalogPage::default());
            }
            Err(e) => return Err(listing_error(e)),
        };

        let page_size = catalog.page_size();
        if page_size == 0 {
            if catalog.total > catalog.data.len() as u64 {
                return Err(SyncError::Pagination {
                    origin: origin.to_string(),
                    channel: channel.to_string(),
                    reason: format!("zero-sized page with {} packages reported", catalog.total),
                });
            }
            return Ok(catalog);
        }

        let iterations = catalog.total.div_ceil(page_size);
        for i in 1..iterations {
            let page = self
                .registry
                .list_packages(origin, channel, Some(i * page_size))
                .await
                .map_err(listing_error)?;
            debug!(origin, channel, range = i * page_size, count = page.len(), "fetched catalog page");
            catalog.data.extend(page.data);
        }

        if catalog.data.len() as u64 != catalog.total {
            warn!(
                registry = self.registry.name(),
                origin,
                channel,
                expected = catalog.total,
                received = catalog.data.len(),
                "catalog changed while listing"
            );
        }
        catalog.start = 0;
        catalog.end = catalog.data.len() as u64;
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ident, publish};
    use async_trait::async_trait;
    use depot_client::{ClientResult, InMemoryRegistry};
    use depot_types::{OriginKey, PackageIdent, PackageRecord};
    use std::path::Path;

    fn registry_with(n: usize, page_size: u64) -> Arc<InMemoryRegistry> {
        let reg = Arc::new(InMemoryRegistry::new("mem").with_page_size(page_size));
        for i in 0..n {
            publish(&reg, &format!("pkg{i:02}"), &[]);
        }
        reg
    }

    #[tokio::test]
    async fn pages_37_by_10_in_4_requests() {
        let reg = registry_with(37, 10);
        let catalog = CatalogLister::new(reg.clone()).list_all("core", "stable").await.unwrap();
        assert_eq!(reg.stats().list_calls, 4);
        assert_eq!(catalog.len(), 37);
        assert_eq!(catalog.total, 37);
        assert_eq!(catalog.data[36], ident("pkg36"));
    }

    #[tokio::test]
    async fn exact_multiple_needs_no_extra_request() {
        let reg = registry_with(30, 10);
        let catalog = CatalogLister::new(reg.clone()).list_all("core", "stable").await.unwrap();
        assert_eq!(reg.stats().list_calls, 3);
        assert_eq!(catalog.len(), 30);
    }

    #[tokio::test]
    async fn single_page_channel() {
        let reg = registry_with(3, 50);
        let catalog = CatalogLister::new(reg.clone()).list_all("core", "stable").await.unwrap();
        assert_eq!(reg.stats().list_calls, 1);
        assert_eq!(catalog.len(), 3);
    }

    #[tokio::test]
    async fn empty_channel_is_empty_not_error() {
        let reg = registry_with(0, 10);
        let catalog = CatalogLister::new(reg).list_all("core", "stable").await.unwrap();
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn failed_first_page_is_error() {
        let reg = registry_with(5, 10);
        reg.fail_listing("core", "stable");
        let err = CatalogLister::new(reg).list_all("core", "stable").await.unwrap_err();
        assert!(matches!(err, SyncError::Listing { .. }));
    }

    #[tokio::test]
    async fn failed_later_page_is_error() {
        let reg = registry_with(25, 10);
        reg.fail_page(20);
        let err = CatalogLister::new(reg).list_all("core", "stable").await.unwrap_err();
        assert!(matches!(err, SyncError::Listing { ref channel, .. } if channel == "stable"));
    }

    /// Depot whose listings all answer with one canned result.
    struct CannedListing(fn() -> ClientResult<CatalogPage>);

    fn zero_sized_page() -> ClientResult<CatalogPage> {
        Ok(CatalogPage { start: 0, end: 0, total: 12, data: vec![] })
    }

    fn unknown_channel() -> ClientResult<CatalogPage> {
        Err(ClientError::NotFound("/v1/depot/channels/core/LTS-2024/pkgs".into()))
    }

    fn unavailable() -> ClientResult<CatalogPage> {
        Err(ClientError::Status { url: "/v1/depot/channels/core/LTS-2024/pkgs".into(), status: 503 })
    }

    #[async_trait]
    impl RegistryClient for CannedListing {
        fn name(&self) -> &str {
            "canned"
        }
        async fn list_packages(&self, _o: &str, _c: &str, _r: Option<u64>) -> ClientResult<CatalogPage> {
            (self.0)()
        }
        async fn fetch_package(&self, id: &PackageIdent) -> ClientResult<PackageRecord> {
            Err(ClientError::NotFound(id.to_string()))
        }
        async fn package_exists(&self, _id: &PackageIdent) -> ClientResult<bool> {
            Ok(false)
        }
        async fn download_artifact(&self, _r: &PackageRecord, _p: &Path) -> ClientResult<u64> {
            Ok(0)
        }
        async fn upload_artifact(&self, _r: &PackageRecord, _p: &Path, _c: &str) -> ClientResult<()> {
            Ok(())
        }
        async fn list_origin_keys(&self, _o: &str) -> ClientResult<Vec<OriginKey>> {
            Ok(vec![])
        }
        async fn fetch_key(&self, _k: &OriginKey) -> ClientResult<String> {
            Ok(String::new())
        }
        async fn import_key(&self, _k: &OriginKey, _p: &Path) -> ClientResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn zero_page_size_with_packages_is_pagination_error() {
        let err = CatalogLister::new(Arc::new(CannedListing(zero_sized_page)))
            .list_all("core", "stable")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Pagination { .. }));
    }

    #[tokio::test]
    async fn absent_channel_is_empty_when_allowed() {
        let lister = CatalogLister::new(Arc::new(CannedListing(unknown_channel)));
        let catalog = lister.list_all_or_empty("core", "LTS-2024").await.unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.total, 0);
    }

    #[tokio::test]
    async fn absent_channel_is_error_for_strict_listing() {
        let lister = CatalogLister::new(Arc::new(CannedListing(unknown_channel)));
        let err = lister.list_all("core", "LTS-2024").await.unwrap_err();
        assert!(matches!(err, SyncError::Listing { source: ClientError::NotFound(_), .. }));
    }

    #[tokio::test]
    async fn server_error_still_fails_lenient_listing() {
        let lister = CatalogLister::new(Arc::new(CannedListing(unavailable)));
        let err = lister.list_all_or_empty("core", "LTS-2024").await.unwrap_err();
        assert!(matches!(err, SyncError::Listing { source: ClientError::Status { status: 503, .. }, .. }));
    }
}
