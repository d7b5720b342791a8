//! Synchronization engine for depot-mirror.
//!
//! Mirrors packages and origin signing keys from an upstream depot to a
//! target depot for a configured set of `(origin, channel)` pairs. One
//! [`Orchestrator::run`] is one sync pass:
//!
//! 1. [`KeySyncer`] replicates missing signing keys for every origin.
//! 2. For every origin and channel, [`CatalogLister`] pages through both
//!    depots and [`SetDiffer`] computes what the target lacks.
//! 3. For every missing package, [`TransferPipeline`] resolves its transitive
//!    dependencies and moves each build (dependencies first) through local
//!    scratch storage into the target's destination channel.
//!
//! Origins and channels are processed one after another. Both depots degrade
//! under concurrent load, so package transfers default to a single worker and
//! key imports to a small bounded pool; both widths live in [`SyncConfig`].
//! Failures are scoped to the identity, key, or channel pass they occur in
//! and collected into a [`SyncReport`].

pub mod cancel;
pub mod catalog;
pub mod config;
pub mod diff;
pub mod error;
pub mod existence;
pub mod keys;
pub mod orchestrator;
pub mod pool;
pub mod resolver;
pub mod scratch;
pub mod transfer;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use cancel::CancelToken;
pub use catalog::CatalogLister;
pub use config::SyncConfig;
pub use diff::{Identified, SetDiffer};
pub use error::{SyncError, SyncResult};
pub use existence::ExistenceCache;
pub use keys::KeySyncer;
pub use orchestrator::Orchestrator;
pub use pool::run_bounded;
pub use resolver::DependencyResolver;
pub use scratch::{ScratchDir, ScratchFile};
pub use transfer::TransferPipeline;
pub use types::{
    ChannelReport, IdentOutcome, KeyFailure, KeySyncReport, PackageOutcome, RunOutcome,
    SyncReport, TransferStatus,
};
