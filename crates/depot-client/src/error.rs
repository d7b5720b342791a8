use thiserror::Error;

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The depot answered with a non-success status.
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// The requested resource does not exist on the depot.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Connection-level failure (DNS, TLS, reset, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The body could not be decoded as the expected JSON document.
    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("invalid registry url: {0}")]
    InvalidUrl(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Result alias for registry operations.
pub type ClientResult<T> = Result<T, ClientError>;
