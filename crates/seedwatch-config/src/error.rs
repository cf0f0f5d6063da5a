//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field was not supplied.
    #[error("missing configuration field")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
    /// A configured directory does not exist.
    #[error("configured directory does not exist")]
    DirectoryMissing {
        /// Field naming the directory.
        field: &'static str,
        /// Offending path.
        path: PathBuf,
    },
    /// A configured path exists but is not a directory.
    #[error("configured path is not a directory")]
    NotADirectory {
        /// Field naming the directory.
        field: &'static str,
        /// Offending path.
        path: PathBuf,
    },
    /// Inspecting a configured path failed.
    #[error("configured path could not be inspected")]
    Io {
        /// Field naming the path.
        field: &'static str,
        /// Offending path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// Descriptor pattern failed to compile.
    #[error("invalid descriptor pattern")]
    InvalidPattern {
        /// Pattern supplied by the operator.
        pattern: String,
        /// Underlying regex error.
        source: regex::Error,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
