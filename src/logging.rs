//! Tracing subscriber setup for the binary.

use tracing_subscriber::filter::LevelFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{Error, Result};

fn level(config: &LoggingConfig) -> Result<LevelFilter> {
    let raw = config.level.trim().to_ascii_lowercase();
    raw.parse::<LevelFilter>().map_err(|_| {
        Error::Config(format!(
            "invalid log level `{}`; expected one of trace, debug, info, warn, error, off",
            config.level
        ))
    })
}

/// Installs the global subscriber. Logs go to stderr.
///
/// # Errors
///
/// Returns an error if the level is invalid or a subscriber is already
/// installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let level = level(config)?;
    let builder = tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr);
    match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    }
    .map_err(|e| Error::Config(format!("initialize logging: {e}")))
}
