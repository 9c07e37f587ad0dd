use std::path::PathBuf;

use crate::cli::Cli;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "off" | "none" => LogLevel::Off,
            "error" => LogLevel::Error,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Warn,
        }
    }

    pub fn as_tracing_level(&self) -> Option<tracing::Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(tracing::Level::ERROR),
            LogLevel::Warn => Some(tracing::Level::WARN),
            LogLevel::Info => Some(tracing::Level::INFO),
            LogLevel::Debug => Some(tracing::Level::DEBUG),
            LogLevel::Trace => Some(tracing::Level::TRACE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("missing required server parameter")]
    MissingServer,

    #[error("missing required file parameter")]
    MissingFile,
}

/// Settings for one run, resolved from the command line and read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub commit: String,
    pub manifest_path: PathBuf,
    pub product: String,
    pub server: String,
    pub log_level: LogLevel,
}

impl Config {
    /// Server is checked before the manifest path; empty values count as
    /// missing.
    pub fn from_cli(cli: Cli) -> Result<Self, UsageError> {
        let server = cli
            .server
            .filter(|s| !s.is_empty())
            .ok_or(UsageError::MissingServer)?;
        let file = cli
            .file
            .filter(|f| !f.is_empty())
            .ok_or(UsageError::MissingFile)?;

        Ok(Self {
            commit: cli.commit.unwrap_or_default(),
            manifest_path: PathBuf::from(file),
            product: cli.product.unwrap_or_default(),
            server,
            log_level: cli
                .log_level
                .as_deref()
                .map(LogLevel::from_str)
                .unwrap_or_default(),
        })
    }
}
