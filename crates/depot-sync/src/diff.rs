use depot_types::{OriginKey, PackageIdent};

/// Entities compared by identity when diffing two depots.
pub trait Identified {
    fn same_identity(&self, other: &Self) -> bool;
}

impl Identified for PackageIdent {
    fn same_identity(&self, other: &Self) -> bool {
        self == other
    }
}

/// Keys are the same key when `(origin, revision)` match; the location is
/// depot-specific.
impl Identified for OriginKey {
    fn same_identity(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

/// Asymmetric set difference between an upstream and a target collection.
pub struct SetDiffer;

impl SetDiffer {
    /// Elements of `upstream` with no identity match in `target`.
    ///
    /// Order follows `upstream`; repeated upstream entries appear once.
    /// Quadratic, which is fine at catalog scale and needs nothing beyond
    /// identity comparison.
    pub fn difference<T: Identified + Clone>(upstream: &[T], target: &[T]) -> Vec<T> {
        let mut missing: Vec<T> = Vec::new();
        for candidate in upstream {
            let on_target = target.iter().any(|t| t.same_identity(candidate));
            let seen = missing.iter().any(|m| m.same_identity(candidate));
            if !on_target && !seen {
                missing.push(candidate.clone());
            }
        }
        missing
    }
}
