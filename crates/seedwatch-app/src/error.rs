//! # Design
//!
//! - Centralize application-level errors for bootstrap and ingestion.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: seedwatch_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: seedwatch_telemetry::TelemetryError,
    },
    /// Filesystem operations needed at startup failed.
    #[error("filesystem operation failed")]
    FsOps {
        /// Operation identifier.
        operation: &'static str,
        /// Source fsops error.
        source: seedwatch_fsops::FsOpsError,
    },
    /// The directory watcher reported an error after startup.
    #[error("directory watcher failed")]
    Watcher {
        /// Source fsops error.
        source: seedwatch_fsops::FsOpsError,
    },
    /// The ingestion task panicked or was cancelled.
    #[error("ingestion task failed")]
    IngestJoin {
        /// Source join error.
        source: tokio::task::JoinError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: seedwatch_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: seedwatch_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn fsops(operation: &'static str, source: seedwatch_fsops::FsOpsError) -> Self {
        Self::FsOps { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "cli.watch_config",
            seedwatch_config::ConfigError::MissingField { field: "watch_dir" },
        );
        assert!(matches!(
            config,
            AppError::Config {
                operation: "cli.watch_config",
                ..
            }
        ));
        assert_eq!(config.to_string(), "configuration operation failed");
        assert!(config.source().is_some());

        let fsops = AppError::fsops(
            "initial_listing",
            seedwatch_fsops::FsOpsError::Io {
                operation: "watch",
                path: PathBuf::from("/missing"),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        );
        assert!(matches!(fsops, AppError::FsOps { .. }));
    }

    #[test]
    fn watcher_error_keeps_source_chain() {
        let err = AppError::Watcher {
            source: seedwatch_fsops::FsOpsError::Io {
                operation: "poll",
                path: PathBuf::from("/watch"),
                source: io::Error::other("device gone"),
            },
        };
        let chain = seedwatch_torrent_core::error_chain(&err);
        assert!(chain.starts_with("directory watcher failed"));
        assert!(chain.contains("device gone"));
    }
}
