use serde::{Deserialize, Serialize};

/// One revision of an origin's public signing key.
///
/// A key is identified by `(origin, revision)`. `location` is the
/// depot-relative path of the key material and may differ between depots.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginKey {
    pub origin: String,
    pub revision: String,
    pub location: String,
}

impl OriginKey {
    pub fn new(
        origin: impl Into<String>,
        revision: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self { origin: origin.into(), revision: revision.into(), location: location.into() }
    }

    /// `(origin, revision)` identity.
    pub fn id(&self) -> (&str, &str) {
        (&self.origin, &self.revision)
    }

    /// Local file name for the public key material.
    pub fn file_name(&self) -> String {
        format!("{}-{}.pub", self.origin, self.revision)
    }
}

impl std::fmt::Display for OriginKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.origin, self.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_origin_revision_pub() {
        let k = OriginKey::new("core", "20160810182414", "/origins/core/keys/20160810182414");
        assert_eq!(k.file_name(), "core-20160810182414.pub");
        assert_eq!(k.to_string(), "core-20160810182414");
    }

    #[test]
    fn id_ignores_location() {
        let a = OriginKey::new("core", "1", "/origins/core/keys/1");
        let b = OriginKey::new("core", "1", "/v2/elsewhere/1");
        assert_eq!(a.id(), b.id());
        assert_ne!(a, b);
    }
}
