//! Error types for the Falcon search engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FalconError>;

#[derive(Error, Debug)]
pub enum FalconError {
    #[error("config error: {0}")]
    Config(String),

    /// A backing-store operation failed. `op` names the failing operation
    /// so callers can tell which store call failed.
    #[error("storage error in {op}: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("corrupted data: {0}")]
    Corruption(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FalconError {
    /// Wrap a rusqlite error, tagging it with the operation that issued it.
    pub fn storage(op: &'static str) -> impl FnOnce(rusqlite::Error) -> FalconError {
        move |source| FalconError::Storage { op, source }
    }
}
