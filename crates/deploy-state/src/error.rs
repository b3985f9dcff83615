//! Error types for deploy-state

use thiserror::Error;

/// Errors raised by repository metadata lookups
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading a store source failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A store source could not be decoded
    #[error("Failed to parse repository store: {0}")]
    Parse(#[from] serde_json::Error),

    /// The backing metadata store reported an error
    #[error("Repository store backend error: {0}")]
    Backend(String),
}
