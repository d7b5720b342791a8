use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Fully qualified identity of one package build.
///
/// Two identities are equal only when all four components match exactly.
/// The depot never reuses a release for different content, so this tuple is
/// the natural key for everything the mirror moves.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageIdent {
    pub origin: String,
    pub name: String,
    pub version: String,
    pub release: String,
}

impl PackageIdent {
    pub fn new(
        origin: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        release: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            name: name.into(),
            version: version.into(),
            release: release.into(),
        }
    }

    /// The `origin/name/version/release` path used by depot endpoints.
    pub fn to_path(&self) -> String {
        format!("{}/{}/{}/{}", self.origin, self.name, self.version, self.release)
    }
}

impl fmt::Display for PackageIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

impl FromStr for PackageIdent {
    type Err = TypeError;

    /// Parse `origin/name/version/release`. All four parts are required.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 4 {
            return Err(TypeError::InvalidIdent {
                input: s.into(),
                reason: format!("expected 4 components, found {}", parts.len()),
            });
        }
        for (part, label) in parts.iter().zip(["origin", "name", "version", "release"]) {
            if part.is_empty() {
                return Err(TypeError::EmptyComponent(label));
            }
        }
        Ok(Self::new(parts[0], parts[1], parts[2], parts[3]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_slash_path() {
        let id = PackageIdent::new("core", "glibc", "2.35", "20230101000000");
        assert_eq!(id.to_string(), "core/glibc/2.35/20230101000000");
    }

    #[test]
    fn parse_roundtrips_display() {
        let id: PackageIdent = "core/zlib/1.3/20240105".parse().unwrap();
        assert_eq!(id, PackageIdent::new("core", "zlib", "1.3", "20240105"));
        assert_eq!(id.to_string().parse::<PackageIdent>().unwrap(), id);
    }

    #[test]
    fn parse_rejects_partial_ident() {
        let err = "core/zlib/1.3".parse::<PackageIdent>().unwrap_err();
        assert!(matches!(err, TypeError::InvalidIdent { .. }));
    }

    #[test]
    fn parse_rejects_empty_component() {
        let err = "core//1.3/20240105".parse::<PackageIdent>().unwrap_err();
        assert_eq!(err, TypeError::EmptyComponent("name"));
    }

    #[test]
    fn equality_requires_all_fields() {
        let a = PackageIdent::new("core", "zlib", "1.3", "1");
        let b = PackageIdent::new("core", "zlib", "1.3", "2");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn deserializes_depot_json() {
        let json = r#"{"origin":"core","name":"zlib","version":"1.3","release":"20240105"}"#;
        let id: PackageIdent = serde_json::from_str(json).unwrap();
        assert_eq!(id.name, "zlib");
    }
}
