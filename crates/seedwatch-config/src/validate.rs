//! Field validation for configuration values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;

use crate::error::{ConfigError, ConfigResult};

/// Ensure `path` names an existing directory, returning it unchanged.
///
/// # Errors
///
/// Returns `MissingField` for an empty path, `DirectoryMissing` when nothing exists at the
/// path, and `NotADirectory` when it names a file.
pub fn existing_directory(field: &'static str, path: &Path) -> ConfigResult<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::MissingField { field });
    }
    match path.metadata() {
        Ok(metadata) if metadata.is_dir() => Ok(path.to_path_buf()),
        Ok(_) => Err(ConfigError::NotADirectory {
            field,
            path: path.to_path_buf(),
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(ConfigError::DirectoryMissing {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(ConfigError::Io {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Reject zero-length intervals.
///
/// # Errors
///
/// Returns `InvalidField` when `interval` is zero.
pub fn non_zero_interval(field: &'static str, interval: Duration) -> ConfigResult<Duration> {
    if interval.is_zero() {
        return Err(ConfigError::InvalidField {
            field,
            reason: "must_be_positive",
            value: Some(format!("{}ms", interval.as_millis())),
        });
    }
    Ok(interval)
}

/// Compile a descriptor file-name pattern.
///
/// # Errors
///
/// Returns `InvalidPattern` when the expression does not compile.
pub fn descriptor_pattern(pattern: &str) -> ConfigResult<Regex> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
