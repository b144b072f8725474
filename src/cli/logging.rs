//! Logging setup using `tracing` + `tracing-subscriber`
//!
//! Priority for determining the log level:
//! 1. `--log-level` flag
//! 2. `--verbose` (debug)
//! 3. `TASKDAG_LOG` environment variable
//! 4. `log_level` from project, then global config
//! 5. `warn`
//!
//! Logs go to stderr so JSON on stdout stays parseable.

use std::io::IsTerminal;

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

pub const LOG_ENV: &str = "TASKDAG_LOG";

/// Log level accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Resolves the effective level from every source
pub fn resolve_level(
    flag: Option<LogLevel>,
    verbose: bool,
    env: Option<&str>,
    config: Option<&str>,
) -> Level {
    if let Some(level) = flag {
        return level.into();
    }
    if verbose {
        return Level::DEBUG;
    }

    env.and_then(parse_level)
        .or_else(|| config.and_then(parse_level))
        .unwrap_or(Level::WARN)
}

fn parse_level(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "warning" => Some(Level::WARN),
        other => other.parse().ok(),
    }
}

/// Installs the global subscriber; call once at startup
pub fn init_logging(level: Level) -> Result<()> {
    fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins() {
        let level = resolve_level(Some(LogLevel::Trace), true, Some("error"), Some("info"));
        assert_eq!(level, Level::TRACE);
    }

    #[test]
    fn verbose_beats_env() {
        assert_eq!(resolve_level(None, true, Some("error"), None), Level::DEBUG);
    }

    #[test]
    fn env_beats_config() {
        assert_eq!(
            resolve_level(None, false, Some("INFO"), Some("trace")),
            Level::INFO
        );
    }

    #[test]
    fn invalid_env_falls_through_to_config() {
        assert_eq!(
            resolve_level(None, false, Some("loud"), Some("warning")),
            Level::WARN
        );
        assert_eq!(
            resolve_level(None, false, Some("loud"), Some("debug")),
            Level::DEBUG
        );
    }

    #[test]
    fn defaults_to_warn() {
        assert_eq!(resolve_level(None, false, None, None), Level::WARN);
    }
}
