use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid package identifier {input:?}: {reason}")]
    InvalidIdent { input: String, reason: String },

    #[error("empty {0} component")]
    EmptyComponent(&'static str),
}
