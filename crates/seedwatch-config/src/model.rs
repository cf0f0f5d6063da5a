//! Typed configuration for the watcher and per-transfer trackers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::Serialize;

use crate::defaults::{DEFAULT_DESCRIPTOR_PATTERN, DEFAULT_POLL_INTERVAL, DEFAULT_WATCH_INTERVAL};
use crate::error::ConfigResult;
use crate::validate;

/// Settings governing each tracking task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackerSettings {
    /// Sleep between poll cycles.
    pub poll_interval: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Validated configuration passed explicitly to every component that needs it.
#[derive(Debug, Clone, Serialize)]
pub struct WatchConfig {
    /// Directory scanned for descriptor files.
    pub watch_dir: PathBuf,
    /// Directory receiving transfer payloads.
    pub output_dir: PathBuf,
    /// Descriptor file-name pattern, matched against the file name only.
    pub descriptor_pattern: String,
    /// Interval between directory scans.
    pub watch_interval: Duration,
    /// Per-transfer tracking settings.
    pub tracker: TrackerSettings,
}

impl WatchConfig {
    /// Build a configuration from directory paths using default intervals.
    ///
    /// # Errors
    ///
    /// Returns an error when either directory is missing or not a directory.
    pub fn new(watch_dir: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> ConfigResult<Self> {
        Self {
            watch_dir: watch_dir.as_ref().to_path_buf(),
            output_dir: output_dir.as_ref().to_path_buf(),
            descriptor_pattern: DEFAULT_DESCRIPTOR_PATTERN.to_string(),
            watch_interval: DEFAULT_WATCH_INTERVAL,
            tracker: TrackerSettings::default(),
        }
        .validated()
    }

    /// Override the tracking poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.tracker.poll_interval = interval;
        self
    }

    /// Override the directory scan interval.
    #[must_use]
    pub fn with_watch_interval(mut self, interval: Duration) -> Self {
        self.watch_interval = interval;
        self
    }

    /// Override the descriptor file-name pattern.
    #[must_use]
    pub fn with_descriptor_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.descriptor_pattern = pattern.into();
        self
    }

    /// Check every field, returning the configuration unchanged when valid.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure encountered.
    pub fn validated(self) -> ConfigResult<Self> {
        validate::existing_directory("watch_dir", &self.watch_dir)?;
        validate::existing_directory("output_dir", &self.output_dir)?;
        validate::non_zero_interval("watch_interval", self.watch_interval)?;
        validate::non_zero_interval("poll_interval", self.tracker.poll_interval)?;
        validate::descriptor_pattern(&self.descriptor_pattern)?;
        Ok(self)
    }

    /// Compile the descriptor pattern.
    ///
    /// # Errors
    ///
    /// Returns an error when the pattern does not compile.
    pub fn descriptor_regex(&self) -> ConfigResult<Regex> {
        validate::descriptor_pattern(&self.descriptor_pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use tempfile::TempDir;

    #[test]
    fn new_applies_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let watch = TempDir::new()?;
        let output = TempDir::new()?;
        let config = WatchConfig::new(watch.path(), output.path())?;
        assert_eq!(config.tracker.poll_interval, Duration::from_secs(5));
        assert_eq!(config.watch_interval, Duration::from_secs(5));
        assert_eq!(config.descriptor_pattern, DEFAULT_DESCRIPTOR_PATTERN);
        assert!(config.descriptor_regex()?.is_match("movie.torrent"));
        Ok(())
    }

    #[test]
    fn overrides_are_revalidated() -> Result<(), Box<dyn std::error::Error>> {
        let watch = TempDir::new()?;
        let output = TempDir::new()?;
        let config = WatchConfig::new(watch.path(), output.path())?
            .with_poll_interval(Duration::ZERO)
            .validated();
        assert!(matches!(
            config,
            Err(ConfigError::InvalidField {
                field: "poll_interval",
                ..
            })
        ));

        let config = WatchConfig::new(watch.path(), output.path())?
            .with_watch_interval(Duration::from_millis(50))
            .with_descriptor_pattern(r".+\.meta$")
            .validated()?;
        assert_eq!(config.watch_interval, Duration::from_millis(50));
        assert!(config.descriptor_regex()?.is_match("a.meta"));
        Ok(())
    }

    #[test]
    fn missing_output_directory_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let watch = TempDir::new()?;
        let result = WatchConfig::new(watch.path(), watch.path().join("absent"));
        assert!(matches!(
            result,
            Err(ConfigError::DirectoryMissing {
                field: "output_dir",
                ..
            })
        ));
        Ok(())
    }
}
