use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use depot_types::{CatalogPage, OriginKey, PackageIdent, PackageRecord};

use crate::endpoint::endpoints;
use crate::error::{ClientError, ClientResult};
use crate::traits::RegistryClient;

const DEFAULT_PAGE_SIZE: u64 = 50;

/// Call counters for an [`InMemoryRegistry`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub list_calls: usize,
    pub record_fetches: usize,
    pub exists_checks: usize,
    pub downloads: usize,
    pub uploads: usize,
    pub key_listings: usize,
    pub key_fetches: usize,
    pub key_imports: usize,
}

#[derive(Default)]
struct Counters {
    list_calls: AtomicUsize,
    record_fetches: AtomicUsize,
    exists_checks: AtomicUsize,
    downloads: AtomicUsize,
    uploads: AtomicUsize,
    key_listings: AtomicUsize,
    key_fetches: AtomicUsize,
    key_imports: AtomicUsize,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

struct StoredPackage {
    record: PackageRecord,
    artifact: Vec<u8>,
}

#[derive(Default)]
struct State {
    packages: HashMap<PackageIdent, StoredPackage>,
    /// Channel listings in publish order, keyed by `(origin, channel)`.
    channels: HashMap<(String, String), Vec<PackageIdent>>,
    /// Keys in publish order, keyed by origin.
    keys: HashMap<String, Vec<(OriginKey, String)>>,
}

/// Injected failures, all answered with a `500`.
#[derive(Default)]
struct Faults {
    listings: HashSet<(String, String)>,
    pages: HashSet<u64>,
    records: HashSet<PackageIdent>,
    downloads: HashSet<PackageIdent>,
    uploads: HashSet<PackageIdent>,
    key_listings: HashSet<String>,
    key_imports: bool,
}

/// In-process depot.
///
/// Behaves like a real depot for everything the sync engine touches:
/// paginated listings, records, artifacts, channel promotion, and origin
/// keys. Intended for tests and embedding. State lives behind `RwLock`s;
/// no lock is held across an `.await`.
pub struct InMemoryRegistry {
    name: String,
    page_size: u64,
    state: RwLock<State>,
    faults: RwLock<Faults>,
    counters: Counters,
}

impl InMemoryRegistry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            page_size: DEFAULT_PAGE_SIZE,
            state: RwLock::new(State::default()),
            faults: RwLock::new(Faults::default()),
            counters: Counters::default(),
        }
    }

    /// Set the listing page size. Zero is clamped to one.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Store a package with its artifact and list it in `channels`.
    pub fn publish(&self, record: PackageRecord, artifact: impl Into<Vec<u8>>, channels: &[&str]) {
        let mut state = self.state.write().expect("lock poisoned");
        let ident = record.ident.clone();
        let mut record = record;
        for channel in channels {
            if !record.in_channel(channel) {
                record.channels.push(channel.to_string());
            }
            let listing = state
                .channels
                .entry((ident.origin.clone(), channel.to_string()))
                .or_default();
            if !listing.contains(&ident) {
                listing.push(ident.clone());
            }
        }
        state.packages.insert(ident, StoredPackage { record, artifact: artifact.into() });
    }

    /// Store a key revision for its origin.
    pub fn add_key(&self, key: OriginKey, material: impl Into<String>) {
        let mut state = self.state.write().expect("lock poisoned");
        let keys = state.keys.entry(key.origin.clone()).or_default();
        if !keys.iter().any(|(k, _)| k.id() == key.id()) {
            keys.push((key, material.into()));
        }
    }

    pub fn contains(&self, ident: &PackageIdent) -> bool {
        self.state.read().expect("lock poisoned").packages.contains_key(ident)
    }

    pub fn record(&self, ident: &PackageIdent) -> Option<PackageRecord> {
        let state = self.state.read().expect("lock poisoned");
        state.packages.get(ident).map(|p| p.record.clone())
    }

    pub fn artifact(&self, ident: &PackageIdent) -> Option<Vec<u8>> {
        let state = self.state.read().expect("lock poisoned");
        state.packages.get(ident).map(|p| p.artifact.clone())
    }

    pub fn channel_idents(&self, origin: &str, channel: &str) -> Vec<PackageIdent> {
        let state = self.state.read().expect("lock poisoned");
        state
            .channels
            .get(&(origin.to_string(), channel.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn key_revisions(&self, origin: &str) -> Vec<String> {
        let state = self.state.read().expect("lock poisoned");
        state
            .keys
            .get(origin)
            .map(|keys| keys.iter().map(|(k, _)| k.revision.clone()).collect())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> RegistryStats {
        let c = &self.counters;
        RegistryStats {
            list_calls: c.list_calls.load(Ordering::SeqCst),
            record_fetches: c.record_fetches.load(Ordering::SeqCst),
            exists_checks: c.exists_checks.load(Ordering::SeqCst),
            downloads: c.downloads.load(Ordering::SeqCst),
            uploads: c.uploads.load(Ordering::SeqCst),
            key_listings: c.key_listings.load(Ordering::SeqCst),
            key_fetches: c.key_fetches.load(Ordering::SeqCst),
            key_imports: c.key_imports.load(Ordering::SeqCst),
        }
    }

    pub fn fail_listing(&self, origin: &str, channel: &str) {
        self.faults_mut().listings.insert((origin.to_string(), channel.to_string()));
    }

    /// Fail any listing request at offset `range`.
    pub fn fail_page(&self, range: u64) {
        self.faults_mut().pages.insert(range);
    }

    pub fn fail_record(&self, ident: &PackageIdent) {
        self.faults_mut().records.insert(ident.clone());
    }

    pub fn fail_download(&self, ident: &PackageIdent) {
        self.faults_mut().downloads.insert(ident.clone());
    }

    pub fn fail_upload(&self, ident: &PackageIdent) {
        self.faults_mut().uploads.insert(ident.clone());
    }

    pub fn fail_key_listing(&self, origin: &str) {
        self.faults_mut().key_listings.insert(origin.to_string());
    }

    pub fn fail_key_imports(&self) {
        self.faults_mut().key_imports = true;
    }

    fn faults_mut(&self) -> std::sync::RwLockWriteGuard<'_, Faults> {
        self.faults.write().expect("lock poisoned")
    }

    fn injected(&self, path: String, failing: impl FnOnce(&Faults) -> bool) -> ClientResult<()> {
        let faults = self.faults.read().expect("lock poisoned");
        if failing(&*faults) {
            return Err(ClientError::Status { url: format!("{}{}", self.name, path), status: 500 });
        }
        Ok(())
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_packages(
        &self,
        origin: &str,
        channel: &str,
        range: Option<u64>,
    ) -> ClientResult<CatalogPage> {
        bump(&self.counters.list_calls);
        let start = range.unwrap_or(0);
        self.injected(endpoints::channel_packages(origin, channel), |f| {
            f.listings.contains(&(origin.to_string(), channel.to_string())) || f.pages.contains(&start)
        })?;

        let listing = self.channel_idents(origin, channel);
        let total = listing.len() as u64;
        let end = (start + self.page_size).min(total).max(start);
        let data = listing
            .into_iter()
            .skip(start as usize)
            .take((end - start) as usize)
            .collect();
        Ok(CatalogPage { start, end, total, data })
    }

    async fn fetch_package(&self, ident: &PackageIdent) -> ClientResult<PackageRecord> {
        bump(&self.counters.record_fetches);
        self.injected(endpoints::package(ident), |f| f.records.contains(ident))?;
        self.record(ident)
            .ok_or_else(|| ClientError::NotFound(endpoints::package(ident)))
    }

    async fn package_exists(&self, ident: &PackageIdent) -> ClientResult<bool> {
        bump(&self.counters.exists_checks);
        Ok(self.contains(ident))
    }

    async fn download_artifact(&self, record: &PackageRecord, dest: &Path) -> ClientResult<u64> {
        bump(&self.counters.downloads);
        let path = endpoints::download(&record.ident);
        self.injected(path.clone(), |f| f.downloads.contains(&record.ident))?;
        let bytes = self.artifact(&record.ident).ok_or(ClientError::NotFound(path))?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(bytes.len() as u64)
    }

    async fn upload_artifact(
        &self,
        record: &PackageRecord,
        src: &Path,
        channel: &str,
    ) -> ClientResult<()> {
        bump(&self.counters.uploads);
        self.injected(endpoints::package(&record.ident), |f| f.uploads.contains(&record.ident))?;
        let artifact = tokio::fs::read(src).await?;
        let mut record = record.clone();
        record.channels.clear();
        self.publish(record, artifact, &[channel]);
        Ok(())
    }

    async fn list_origin_keys(&self, origin: &str) -> ClientResult<Vec<OriginKey>> {
        bump(&self.counters.key_listings);
        self.injected(endpoints::origin_keys(origin), |f| f.key_listings.contains(origin))?;
        let state = self.state.read().expect("lock poisoned");
        Ok(state
            .keys
            .get(origin)
            .map(|keys| keys.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default())
    }

    async fn fetch_key(&self, key: &OriginKey) -> ClientResult<String> {
        bump(&self.counters.key_fetches);
        let state = self.state.read().expect("lock poisoned");
        state
            .keys
            .values()
            .flatten()
            .find(|(k, _)| k.location == key.location)
            .map(|(_, material)| material.clone())
            .ok_or_else(|| ClientError::NotFound(endpoints::key_material(&key.location)))
    }

    async fn import_key(&self, key: &OriginKey, src: &Path) -> ClientResult<()> {
        bump(&self.counters.key_imports);
        self.injected(endpoints::origin_key(key), |f| f.key_imports)?;
        let material = tokio::fs::read_to_string(src).await?;
        let location = format!("/origins/{}/keys/{}", key.origin, key.revision);
        self.add_key(OriginKey::new(&key.origin, &key.revision, location), material);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.state.read().expect("lock poisoned").packages.len();
        f.debug_struct("InMemoryRegistry")
            .field("name", &self.name)
            .field("package_count", &count)
            .finish()
    }
}
