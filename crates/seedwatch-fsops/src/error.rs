//! # Design
//!
//! - Constant-message errors for descriptor discovery and cleanup.
//! - Operation and path context live in fields, never in the message.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for filesystem operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced while discovering, watching, or removing descriptors.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// IO failures while interacting with the filesystem.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Directory enumeration failures.
    #[error("fsops walkdir failure")]
    Walkdir {
        /// Operation that triggered the walkdir failure.
        operation: &'static str,
        /// Directory being enumerated.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// Directory watcher failures.
    #[error("fsops watcher failure")]
    Watch {
        /// Operation that triggered the watcher failure.
        operation: &'static str,
        /// Watched directory.
        path: PathBuf,
        /// Underlying notify error.
        source: notify::Error,
    },
    /// Descriptor pattern failed to compile.
    #[error("fsops invalid descriptor pattern")]
    InvalidPattern {
        /// Pattern that failed to compile.
        pattern: String,
        /// Underlying regex error.
        source: regex::Error,
    },
}
