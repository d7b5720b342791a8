use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use depot_client::{ClientResult, RegistryClient};
use depot_types::PackageIdent;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Run-wide memo of which identities exist on the target.
///
/// Packages in one channel share most of their dependency closure, so the
/// same existence probe would otherwise hit the target once per dependent.
/// Entries are only ever flipped to present, after a successful upload.
#[derive(Default)]
pub struct ExistenceCache {
    known: Mutex<HashMap<PackageIdent, bool>>,
    locks: Mutex<HashMap<PackageIdent, Arc<AsyncMutex<()>>>>,
}

impl ExistenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ident: &PackageIdent) -> Option<bool> {
        self.known.lock().expect("lock poisoned").get(ident).copied()
    }

    pub fn mark_present(&self, ident: &PackageIdent) {
        self.known.lock().expect("lock poisoned").insert(ident.clone(), true);
    }

    /// Cached answer, or ask `target` and remember it.
    pub async fn exists(&self, target: &dyn RegistryClient, ident: &PackageIdent) -> ClientResult<bool> {
        if let Some(present) = self.get(ident) {
            return Ok(present);
        }
        let present = target.package_exists(ident).await?;
        self.known.lock().expect("lock poisoned").entry(ident.clone()).or_insert(present);
        Ok(present)
    }

    /// Exclusive access to `ident` for the duration of one transfer attempt,
    /// so concurrent workers sharing a dependency move it only once.
    pub async fn lock(&self, ident: &PackageIdent) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().expect("lock poisoned");
            locks.entry(ident.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.known.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ExistenceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExistenceCache").field("known", &self.len()).finish()
    }
}
