//! Error types for transfer engine operations.
//!
//! # Design
//!
//! - Constant messages; context (operation, descriptor path, reason) lives in fields.
//! - `describe` renders the message together with its context for user-facing surfaces such as
//!   a record's display name.

use std::error::Error;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for transfer operations.
#[derive(Debug, Error)]
pub enum TorrentError {
    /// Operation is not supported by the underlying engine.
    #[error("torrent operation not supported")]
    Unsupported {
        /// Operation identifier.
        operation: &'static str,
    },
    /// Operation failed in the underlying engine.
    #[error("torrent operation failed")]
    OperationFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Descriptor the operation applied to, when available.
        descriptor: Option<PathBuf>,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Descriptor file could not be read.
    #[error("torrent descriptor unreadable")]
    DescriptorIo {
        /// Path of the descriptor file.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Descriptor file was read but is not valid metainfo.
    #[error("invalid torrent descriptor")]
    InvalidDescriptor {
        /// Path of the descriptor file.
        path: PathBuf,
        /// Machine-readable reason for the rejection.
        reason: &'static str,
    },
}

impl TorrentError {
    /// Render the error message with its context and source chain on a single line.
    #[must_use]
    pub fn describe(&self) -> String {
        let context = match self {
            Self::Unsupported { operation } => Some((*operation).to_string()),
            Self::OperationFailed {
                operation,
                descriptor,
                ..
            } => Some(descriptor.as_ref().map_or_else(
                || (*operation).to_string(),
                |path| format!("{operation} {}", path.display()),
            )),
            Self::DescriptorIo { path, .. } => Some(path.display().to_string()),
            Self::InvalidDescriptor { path, reason } => {
                Some(format!("{reason} in {}", path.display()))
            }
        };
        let chain = error_chain(self);
        match context {
            Some(context) => format!("{chain} ({context})"),
            None => chain,
        }
    }
}

/// Join an error and every `source()` beneath it with `": "`.
#[must_use]
pub fn error_chain(err: &(dyn Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut current = err.source();
    while let Some(source) = current {
        rendered.push_str(": ");
        rendered.push_str(&source.to_string());
        current = source.source();
    }
    rendered
}

/// Convenience alias for transfer operation results.
pub type TorrentResult<T> = Result<T, TorrentError>;
