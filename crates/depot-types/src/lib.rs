//! Foundation types for depot-mirror.
//!
//! Value types describing what lives in a package depot. None of them carry
//! behavior beyond naming and parsing; every run rebuilds them from live
//! API responses.
//!
//! # Key Types
//!
//! - [`PackageIdent`] -- `(origin, name, version, release)`, the natural key of one build
//! - [`PackageRecord`] -- full metadata for one build, including `deps` and `tdeps`
//! - [`CatalogPage`] -- one page of a channel listing
//! - [`OriginKey`] -- one revision of an origin's public signing key
//! - [`SyncScope`] -- an origin and the channels to mirror for it

pub mod catalog;
pub mod error;
pub mod ident;
pub mod key;
pub mod package;
pub mod scope;

pub use catalog::CatalogPage;
pub use error::TypeError;
pub use ident::PackageIdent;
pub use key::OriginKey;
pub use package::PackageRecord;
pub use scope::SyncScope;
