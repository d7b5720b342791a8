//! Registry access for depot-mirror.
//!
//! Everything the sync engine knows about a remote depot goes through the
//! [`RegistryClient`] trait. Two implementations ship with this crate:
//!
//! - [`HttpRegistryClient`] -- talks to a depot's REST API over HTTP(S)
//! - [`InMemoryRegistry`] -- a complete in-process depot for tests and embedding
//!
//! Transport concerns (timeouts, auth headers, status mapping, JSON decoding)
//! stay on this side of the seam. Callers receive typed values or a
//! [`ClientError`]; an empty result always means "empty", never "failed".

pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod memory;
pub mod traits;

pub use config::{ClientTimeouts, RegistryConfig};
pub use endpoint::endpoints;
pub use error::{ClientError, ClientResult};
pub use http::HttpRegistryClient;
pub use memory::{InMemoryRegistry, RegistryStats};
pub use traits::RegistryClient;
