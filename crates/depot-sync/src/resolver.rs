use std::sync::Arc;

use depot_client::RegistryClient;
use depot_types::{PackageIdent, PackageRecord};
use tracing::warn;

use crate::error::{SyncError, SyncResult};

/// Looks up the transitive dependency closure of a package on upstream.
#[derive(Clone)]
pub struct DependencyResolver {
    upstream: Arc<dyn RegistryClient>,
}

impl DependencyResolver {
    pub fn new(upstream: Arc<dyn RegistryClient>) -> Self {
        Self { upstream }
    }

    /// The `tdeps` of `ident`, never including `ident` itself.
    pub async fn resolve(&self, ident: &PackageIdent) -> SyncResult<Vec<PackageIdent>> {
        Ok(self.resolve_with_record(ident).await?.1)
    }

    /// Like [`resolve`](Self::resolve), also handing back the fetched record.
    pub async fn resolve_with_record(
        &self,
        ident: &PackageIdent,
    ) -> SyncResult<(PackageRecord, Vec<PackageIdent>)> {
        let record = self
            .upstream
            .fetch_package(ident)
            .await
            .map_err(|source| SyncError::Resolve { ident: ident.clone(), source })?;
        let deps = Self::closure_of(&record);
        Ok((record, deps))
    }

    /// `record.tdeps` without duplicates and without the record's own ident.
    pub fn closure_of(record: &PackageRecord) -> Vec<PackageIdent> {
        let mut deps: Vec<PackageIdent> = Vec::with_capacity(record.tdeps.len());
        for dep in &record.tdeps {
            if *dep == record.ident {
                warn!(package = %record.ident, "package lists itself as a dependency; ignoring");
                continue;
            }
            if !deps.contains(dep) {
                deps.push(dep.clone());
            }
        }
        deps
    }
}
