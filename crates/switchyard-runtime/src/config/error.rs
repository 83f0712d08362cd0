//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// No enabled format (see the `toml-config`/`yaml-config` features)
    /// reads this file.
    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Merged sources did not deserialize into [`AppConfig`](super::AppConfig).
    #[error("Failed to extract configuration: {0}")]
    Extract(Box<figment::Error>),

    #[error("Invalid `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("`{0}` must be set")]
    Required(&'static str),
}

impl ConfigError {
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }

    /// The dotted configuration key at fault, if any.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            Self::Invalid { key, .. } | Self::Required(key) => Some(key),
            _ => None,
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Extract(Box::new(err))
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
