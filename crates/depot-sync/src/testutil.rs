use std::path::Path;
use std::sync::Arc;

use depot_client::{InMemoryRegistry, RegistryClient};
use depot_types::{OriginKey, PackageIdent, PackageRecord};

pub fn ident(name: &str) -> PackageIdent {
    PackageIdent::new("core", name, "1.0", "20240101000000")
}

pub fn record(name: &str, tdeps: &[&str]) -> PackageRecord {
    let mut r = PackageRecord::new(ident(name), "x86_64-linux");
    r.tdeps = tdeps.iter().map(|d| ident(d)).collect();
    r.deps = r.tdeps.clone();
    r.checksum = format!("sum-{name}");
    r
}

pub fn key(revision: &str) -> OriginKey {
    OriginKey::new("core", revision, format!("/origins/core/keys/{revision}"))
}

/// Publish `name` (depending on `tdeps`) into the `stable` channel.
pub fn publish(registry: &InMemoryRegistry, name: &str, tdeps: &[&str]) {
    registry.publish(record(name, tdeps), format!("artifact-{name}").into_bytes(), &["stable"]);
}

pub fn pair() -> (Arc<InMemoryRegistry>, Arc<InMemoryRegistry>) {
    (
        Arc::new(InMemoryRegistry::new("upstream")),
        Arc::new(InMemoryRegistry::new("target")),
    )
}

pub fn dyn_client(registry: &Arc<InMemoryRegistry>) -> Arc<dyn RegistryClient> {
    registry.clone()
}

pub fn dir_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}
