//! Engine configuration.
//!
//! Values come from an optional YAML file, then `MOCKTAPE_*` environment
//! variables (a `.env` file in the working directory is loaded first).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::matcher::ArrayMatch;
use crate::selector::DEFAULT_UNFILTERED_CAP;

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "MOCKTAPE_";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace`, `debug`, `info`, `warn`, `error` or `off`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into(), format: LogFormat::default() }
    }
}

/// Response comparison settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Array comparison policy.
    pub array_match: ArrayMatch,
}

/// Mock selection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Bound on fallback candidates outside the test window.
    pub unfiltered_cap: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { unfiltered_cap: DEFAULT_UNFILTERED_CAP }
    }
}

/// Generic capture settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericConfig {
    /// Gzip non-UTF-8 chunks before base64.
    pub compress_binary: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory holding the test sets.
    pub path: PathBuf,
    /// Name of the mocks document inside a test set.
    pub mock_file: String,
    /// Logging.
    pub log: LoggingConfig,
    /// Matching.
    pub matching: MatchingConfig,
    /// Selection.
    pub selection: SelectionConfig,
    /// Generic capture.
    pub generic: GenericConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("keploy"),
            mock_file: "mocks".into(),
            log: LoggingConfig::default(),
            matching: MatchingConfig::default(),
            selection: SelectionConfig::default(),
            generic: GenericConfig::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| Error::Config(format!("{key}: cannot parse `{value}`")))
}

fn parse_enum<T: for<'de> Deserialize<'de>>(key: &str, value: &str) -> Result<T> {
    serde_yaml::from_str(&value.trim().to_ascii_lowercase())
        .map_err(|e| Error::Config(format!("{key}: {e}")))
}

impl Config {
    /// Parses a YAML document; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or fails validation.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| Error::yaml("configuration", e))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads `file` (when given), then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value is invalid.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = match file {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
                Self::from_yaml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(std::env::vars())?;
        Ok(config)
    }

    /// Applies `MOCKTAPE_*` overrides from `vars`; other keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if an override does not parse.
    pub fn apply_env(&mut self, vars: impl IntoIterator<Item = (String, String)>) -> Result<()> {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else { continue };
            match name {
                "PATH" => self.path = PathBuf::from(value),
                "MOCK_FILE" => self.mock_file = value,
                "LOG_LEVEL" => self.log.level = value,
                "LOG_FORMAT" => self.log.format = parse_enum(&key, &value)?,
                "ARRAY_MATCH" => self.matching.array_match = parse_enum(&key, &value)?,
                "UNFILTERED_CAP" => self.selection.unfiltered_cap = parse_env(&key, &value)?,
                "COMPRESS_BINARY" => self.generic.compress_binary = parse_env(&key, &value)?,
                _ => {}
            }
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::Config("path must not be empty".into()));
        }
        if self.mock_file.is_empty() || self.mock_file.contains(['/', '\\']) {
            return Err(Error::Config(format!("mock_file `{}` must be a plain name", self.mock_file)));
        }
        Ok(())
    }
}
