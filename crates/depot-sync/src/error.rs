use depot_client::ClientError;
use depot_types::PackageIdent;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("listing {origin}/{channel} on {registry} failed: {source}")]
    Listing {
        registry: String,
        origin: String,
        channel: String,
        source: ClientError,
    },

    #[error("inconsistent pagination for {origin}/{channel}: {reason}")]
    Pagination { origin: String, channel: String, reason: String },

    #[error("resolving dependencies of {ident} failed: {source}")]
    Resolve { ident: PackageIdent, source: ClientError },

    #[error("listing keys of {origin} on {registry} failed: {source}")]
    KeyListing { registry: String, origin: String, source: ClientError },

    #[error("registry error: {0}")]
    Client(#[from] ClientError),

    #[error("sync cancelled")]
    Cancelled,

    #[error("worker task failed: {0}")]
    Task(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
