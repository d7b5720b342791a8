use chrono::{DateTime, Utc};
use depot_types::{OriginKey, PackageIdent};
use serde::Serialize;
use uuid::Uuid;

/// What happened to one identity in a transfer chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferStatus {
    Transferred { bytes: u64 },
    AlreadyPresent,
    Failed { reason: String },
    Cancelled,
}

impl TransferStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IdentOutcome {
    pub ident: PackageIdent,
    #[serde(flatten)]
    pub status: TransferStatus,
}

/// Result of moving one missing package and its dependency chain.
///
/// `chain` holds one entry per identity attempted, dependencies first and
/// the package itself last. It stops at the first failure, in which case
/// the last entry is the package marked failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PackageOutcome {
    pub package: PackageIdent,
    pub chain: Vec<IdentOutcome>,
}

impl PackageOutcome {
    pub fn new(package: PackageIdent) -> Self {
        Self { package, chain: Vec::new() }
    }

    pub fn push(&mut self, ident: PackageIdent, status: TransferStatus) {
        self.chain.push(IdentOutcome { ident, status });
    }

    /// Status of the package itself.
    pub fn status(&self) -> Option<&TransferStatus> {
        self.chain.iter().rev().find(|o| o.ident == self.package).map(|o| &o.status)
    }

    pub fn is_failed(&self) -> bool {
        self.chain.iter().any(|o| o.status.is_failed())
    }

    pub fn is_cancelled(&self) -> bool {
        self.chain.iter().any(|o| o.status == TransferStatus::Cancelled)
    }
}

/// One `origin/channel` package pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChannelReport {
    pub origin: String,
    pub channel: String,
    pub upstream_count: usize,
    pub target_count: usize,
    pub missing: usize,
    pub packages: Vec<PackageOutcome>,
    /// Set when the pass could not run, e.g. a listing failed.
    pub error: Option<String>,
}

impl ChannelReport {
    pub fn new(origin: impl Into<String>, channel: impl Into<String>) -> Self {
        Self { origin: origin.into(), channel: channel.into(), ..Self::default() }
    }

    pub fn failed(&self) -> usize {
        self.packages.iter().filter(|p| p.is_failed()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.failed() == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeyFailure {
    pub key: OriginKey,
    pub reason: String,
}

/// Key replication for one origin.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct KeySyncReport {
    pub origin: String,
    pub upstream_count: usize,
    pub target_count: usize,
    pub imported: Vec<OriginKey>,
    pub failed: Vec<KeyFailure>,
    pub error: Option<String>,
}

impl KeySyncReport {
    pub fn new(origin: impl Into<String>) -> Self {
        Self { origin: origin.into(), ..Self::default() }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.failed.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    FullySynced,
    PartiallySynced,
    Aborted,
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::FullySynced => 0,
            Self::Aborted => 1,
            Self::PartiallySynced => 2,
        }
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullySynced => write!(f, "fully synced"),
            Self::PartiallySynced => write!(f, "partially synced"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Everything one sync run did.
#[derive(Clone, Debug, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub keys: Vec<KeySyncReport>,
    pub channels: Vec<ChannelReport>,
    pub cancelled: bool,
}

impl SyncReport {
    pub fn begin() -> Self {
        Self {
            run_id: Uuid::now_v7(),
            started_at: Utc::now(),
            finished_at: None,
            keys: Vec::new(),
            channels: Vec::new(),
            cancelled: false,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    fn statuses(&self) -> impl Iterator<Item = &TransferStatus> {
        self.channels
            .iter()
            .flat_map(|c| &c.packages)
            .flat_map(|p| &p.chain)
            .map(|o| &o.status)
    }

    /// Identities uploaded to the target.
    pub fn transferred(&self) -> usize {
        self.statuses().filter(|s| matches!(s, TransferStatus::Transferred { .. })).count()
    }

    /// Identities found already present on the target.
    pub fn skipped(&self) -> usize {
        self.statuses().filter(|s| **s == TransferStatus::AlreadyPresent).count()
    }

    /// Missing packages whose chain failed.
    pub fn failed(&self) -> usize {
        self.channels.iter().map(ChannelReport::failed).sum()
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.statuses()
            .map(|s| match s {
                TransferStatus::Transferred { bytes } => *bytes,
                _ => 0,
            })
            .sum()
    }

    pub fn keys_imported(&self) -> usize {
        self.keys.iter().map(|k| k.imported.len()).sum()
    }

    pub fn outcome(&self) -> RunOutcome {
        let all_passes_failed =
            !self.channels.is_empty() && self.channels.iter().all(|c| c.error.is_some());
        if self.cancelled || all_passes_failed {
            return RunOutcome::Aborted;
        }
        let complete = self.channels.iter().all(ChannelReport::is_complete)
            && self.keys.iter().all(KeySyncReport::is_complete);
        if complete {
            RunOutcome::FullySynced
        } else {
            RunOutcome::PartiallySynced
        }
    }
}
