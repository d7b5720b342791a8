use std::path::Path;

use async_trait::async_trait;
use depot_types::{CatalogPage, OriginKey, PackageIdent, PackageRecord};

use crate::error::ClientResult;

/// Access to one package depot.
///
/// All implementations must satisfy these invariants:
/// - A failed call returns `Err`, never an empty value standing in for one.
/// - `package_exists` answers `Ok(false)` only when the depot reports the
///   package as absent.
/// - Implementations are safe to share across tasks (`Send + Sync`).
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Human-readable name for logs, usually the base URL.
    fn name(&self) -> &str;

    /// One page of a channel listing. `range` is the offset of the first
    /// entry; `None` asks for the first page.
    async fn list_packages(
        &self,
        origin: &str,
        channel: &str,
        range: Option<u64>,
    ) -> ClientResult<CatalogPage>;

    async fn fetch_package(&self, ident: &PackageIdent) -> ClientResult<PackageRecord>;

    async fn package_exists(&self, ident: &PackageIdent) -> ClientResult<bool>;

    /// Write the artifact for `record` to `dest`. Returns the byte count.
    async fn download_artifact(&self, record: &PackageRecord, dest: &Path) -> ClientResult<u64>;

    /// Upload the artifact at `src` and make it visible in `channel`.
    async fn upload_artifact(
        &self,
        record: &PackageRecord,
        src: &Path,
        channel: &str,
    ) -> ClientResult<()>;

    async fn list_origin_keys(&self, origin: &str) -> ClientResult<Vec<OriginKey>>;

    /// Raw public key material for `key`.
    async fn fetch_key(&self, key: &OriginKey) -> ClientResult<String>;

    /// Import the public key file at `src` as `key`.
    async fn import_key(&self, key: &OriginKey, src: &Path) -> ClientResult<()>;
}
