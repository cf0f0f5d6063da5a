//! Error types for registry operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the lifecycle registry.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A non-terminal record already tracks the descriptor.
    #[error("descriptor already tracked")]
    AlreadyTracked {
        /// Descriptor path.
        path: PathBuf,
    },
    /// No record exists at the requested index.
    #[error("unknown record")]
    UnknownRecord {
        /// Requested index.
        index: usize,
    },
}

/// Convenience alias for registry results.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
