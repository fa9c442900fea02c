//! Command line and environment configuration.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Default data file, relative to the working directory.
pub const DEFAULT_DATA_FILE: &str = "marketplace_data.json";

/// Environment variable overriding the data file location.
pub const DATA_ENV: &str = "MARKETPLACE_DATA";

pub const USAGE: &str = "usage: marketplace [import <catalog.csv> | export]";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
}

/// What the binary should do.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Interactive,
    Import(PathBuf),
    Export,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_path: PathBuf,
    pub mode: Mode,
}

impl Config {
    /// Load from the process arguments and environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_parts(env::args().skip(1), env::var_os(DATA_ENV).map(PathBuf::from))
    }

    /// Build from arguments (without the program name) and an optional data path.
    pub fn from_parts(
        args: impl IntoIterator<Item = String>,
        data_path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let mut args = args.into_iter();
        let mode = match args.next().as_deref() {
            None => Mode::Interactive,
            Some("import") => {
                let path = args.next().ok_or(ConfigError::MissingArgument("import"))?;
                Mode::Import(PathBuf::from(path))
            }
            Some("export") => Mode::Export,
            Some(other) => return Err(ConfigError::UnknownCommand(other.to_string())),
        };
        if let Some(extra) = args.next() {
            return Err(ConfigError::UnexpectedArgument(extra));
        }

        Ok(Self {
            data_path: data_path.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE)),
            mode,
        })
    }
}
