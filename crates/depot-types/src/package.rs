use serde::{Deserialize, Serialize};

use crate::ident::PackageIdent;

/// Full metadata for one package build as reported by a depot.
///
/// `tdeps` is the transitive dependency closure resolved by the depot at
/// publish time. Depots only admit acyclic graphs, so `tdeps` never contains
/// `ident` itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub ident: PackageIdent,
    /// Platform triple the artifact was built for, e.g. `x86_64-linux`.
    pub target: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub deps: Vec<PackageIdent>,
    #[serde(default)]
    pub tdeps: Vec<PackageIdent>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub manifest: String,
    #[serde(default)]
    pub config: String,
    #[serde(default)]
    pub exposes: Vec<u16>,
    #[serde(default)]
    pub is_a_service: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl PackageRecord {
    /// A record with only identity and target set.
    pub fn new(ident: PackageIdent, target: impl Into<String>) -> Self {
        Self {
            ident,
            target: target.into(),
            checksum: String::new(),
            visibility: "public".into(),
            deps: Vec::new(),
            tdeps: Vec::new(),
            channels: Vec::new(),
            manifest: String::new(),
            config: String::new(),
            exposes: Vec::new(),
            is_a_service: false,
            owner_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Deterministic local file name for this build's artifact.
    pub fn artifact_file_name(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}.hart",
            self.ident.origin, self.ident.name, self.ident.version, self.ident.release, self.target
        )
    }

    pub fn in_channel(&self, channel: &str) -> bool {
        self.channels.iter().any(|c| c == channel)
    }
}
