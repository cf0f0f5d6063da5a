//! Command-line flags and their translation into configuration values.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use seedwatch_config::{ConfigResult, DEFAULT_DESCRIPTOR_PATTERN, WatchConfig};
use seedwatch_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig};
use seedwatch_torrent_sim::{DEFAULT_RATE_BPS, SimSettings};

const DEFAULT_INTERVAL_SECS: u64 = 5;

/// Flags accepted by the `seedwatch` binary.
#[derive(Debug, Parser)]
#[command(
    name = "seedwatch",
    version,
    about = "Watch a directory for .torrent descriptors and supervise each transfer"
)]
pub struct Cli {
    /// Directory watched for descriptor files.
    #[arg(short = 'i', long = "input", env = "SEEDWATCH_WATCH_DIR", value_name = "DIR")]
    pub input: PathBuf,
    /// Directory transfers write their payload into.
    #[arg(short = 'o', long = "output", env = "SEEDWATCH_OUTPUT_DIR", value_name = "DIR")]
    pub output: PathBuf,
    /// Seconds between progress polls of each transfer.
    #[arg(
        long,
        env = "SEEDWATCH_POLL_INTERVAL",
        value_name = "SECS",
        default_value_t = DEFAULT_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval: u64,
    /// Seconds between scans of the watched directory.
    #[arg(
        long,
        env = "SEEDWATCH_WATCH_INTERVAL",
        value_name = "SECS",
        default_value_t = DEFAULT_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub watch_interval: u64,
    /// Regular expression a file name must match to be treated as a descriptor.
    #[arg(
        long,
        env = "SEEDWATCH_DESCRIPTOR_PATTERN",
        value_name = "REGEX",
        default_value = DEFAULT_DESCRIPTOR_PATTERN
    )]
    pub pattern: String,
    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "SEEDWATCH_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
    /// Log output format; defaults to pretty for debug builds and JSON otherwise.
    #[arg(long, env = "SEEDWATCH_LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormatArg>,
    /// Bytes per second completed by the simulated engine.
    #[arg(
        long,
        env = "SEEDWATCH_SIM_RATE",
        value_name = "BYTES_PER_SEC",
        default_value_t = DEFAULT_RATE_BPS
    )]
    pub sim_rate: u64,
}

/// Log format selection on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    /// Structured JSON lines.
    Json,
    /// Human-readable lines.
    Pretty,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Json => Self::Json,
            LogFormatArg::Pretty => Self::Pretty,
        }
    }
}

impl Cli {
    /// Parse the process arguments, printing usage and exiting on invalid input.
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// Build the validated watch configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when either directory is missing, an interval is zero, or
    /// the pattern does not compile.
    pub fn watch_config(&self) -> ConfigResult<WatchConfig> {
        WatchConfig::new(&self.input, &self.output)?
            .with_poll_interval(Duration::from_secs(self.poll_interval))
            .with_watch_interval(Duration::from_secs(self.watch_interval))
            .with_descriptor_pattern(self.pattern.as_str())
            .validated()
    }

    /// Logging configuration derived from the flags.
    #[must_use]
    pub fn logging_config(&self) -> LoggingConfig<'_> {
        LoggingConfig {
            level: &self.log_level,
            format: self.log_format.map_or_else(LogFormat::infer, LogFormat::from),
            ..LoggingConfig::default()
        }
    }

    /// Settings for the simulated engine.
    #[must_use]
    pub fn sim_settings(&self) -> SimSettings {
        SimSettings {
            rate_bps: self.sim_rate,
            ..SimSettings::default()
        }
    }
}

/// Accept the single-dash `-help` spelling as `--help`.
#[must_use]
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            if arg == "-help" {
                OsString::from("--help")
            } else {
                arg
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use tempfile::TempDir;

    fn args(values: &[&str]) -> Vec<OsString> {
        values.iter().map(OsString::from).collect()
    }

    #[test]
    fn single_dash_help_is_rewritten() {
        let normalized = normalize_args(args(&["seedwatch", "-help", "-i", "-help-dir"]));
        assert_eq!(normalized, args(&["seedwatch", "--help", "-i", "-help-dir"]));

        let Err(err) = Cli::try_parse_from(normalize_args(args(&["seedwatch", "-help"]))) else {
            panic!("help should short-circuit parsing");
        };
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn missing_required_directories_are_rejected() {
        let Err(err) = Cli::try_parse_from(args(&["seedwatch", "-i", "/watch"])) else {
            panic!("missing -o should fail");
        };
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn zero_interval_is_rejected_by_the_parser() {
        let result = Cli::try_parse_from(args(&[
            "seedwatch",
            "-i",
            "/watch",
            "-o",
            "/out",
            "--poll-interval",
            "0",
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn flags_build_watch_config() -> anyhow::Result<()> {
        let watch = TempDir::new()?;
        let output = TempDir::new()?;
        let watch_arg = watch.path().to_string_lossy().into_owned();
        let output_arg = output.path().to_string_lossy().into_owned();
        let cli = Cli::try_parse_from(args(&[
            "seedwatch",
            "-i",
            &watch_arg,
            "--output",
            &output_arg,
            "--poll-interval",
            "2",
            "--log-format",
            "json",
            "--sim-rate",
            "1024",
        ]))?;

        let config = cli.watch_config()?;
        assert_eq!(config.watch_dir, watch.path());
        assert_eq!(config.output_dir, output.path());
        assert_eq!(config.tracker.poll_interval, Duration::from_secs(2));
        assert_eq!(config.watch_interval, Duration::from_secs(DEFAULT_INTERVAL_SECS));
        assert_eq!(cli.logging_config().format, LogFormat::Json);
        assert_eq!(cli.sim_settings().rate_bps, 1024);
        assert_eq!(config.descriptor_pattern, DEFAULT_DESCRIPTOR_PATTERN);
        Ok(())
    }

    #[test]
    fn pattern_flag_overrides_descriptor_pattern() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let dir_arg = dir.path().to_string_lossy().into_owned();
        let cli = Cli::try_parse_from(args(&[
            "seedwatch", "-i", &dir_arg, "-o", &dir_arg, "--pattern", r".+\.meta$",
        ]))?;
        let config = cli.watch_config()?;
        assert_eq!(config.descriptor_pattern, r".+\.meta$");
        assert!(config.descriptor_regex()?.is_match("x.meta"));

        let broken = Cli::try_parse_from(args(&[
            "seedwatch", "-i", &dir_arg, "-o", &dir_arg, "--pattern", "(",
        ]))?;
        assert!(broken.watch_config().is_err());
        Ok(())
    }

    #[test]
    fn nonexistent_directory_is_a_config_error() -> anyhow::Result<()> {
        let output = TempDir::new()?;
        let missing = output.path().join("absent");
        let cli = Cli::try_parse_from(vec![
            OsString::from("seedwatch"),
            OsString::from("-i"),
            missing.into_os_string(),
            OsString::from("-o"),
            output.path().as_os_str().to_os_string(),
        ])?;
        assert!(cli.watch_config().is_err());
        Ok(())
    }
}
