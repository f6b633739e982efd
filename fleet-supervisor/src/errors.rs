use std::path::PathBuf;
use thiserror::Error;

use fleet_unix::{PidFileError, SignalSendError};

/// Format a YAML error for display, including the field path
fn format_yaml_error(e: &serde_path_to_error::Error<serde_yaml::Error>) -> String {
    let path = e.path().to_string();
    let inner = e.inner();
    let msg = inner.to_string();

    let located = match inner.location() {
        Some(loc) => format!("line {}, column {}: {}", loc.line(), loc.column(), msg),
        None => msg,
    };

    if path.is_empty() || path == "." {
        located
    } else {
        format!("{}: {}", path, located)
    }
}

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse config file '{path}':\n  {}", format_yaml_error(.source))]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_path_to_error::Error<serde_yaml::Error>,
    },

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Program not found: {0}")]
    ProgramNotFound(String),

    #[error("Program {0} is already running")]
    AlreadyRunning(String),

    #[error("Failed to spawn program {program}: {source}")]
    ProcessSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to signal program {program}: {source}")]
    Signal {
        program: String,
        #[source]
        source: SignalSendError,
    },

    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    PidFile(#[from] PidFileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("duration {0:?} does not start with a number")]
    MissingValue(String),

    #[error("duration {input:?} has unknown unit {unit:?}, expected ms, s or m")]
    UnknownUnit { input: String, unit: String },

    #[error("duration {0:?} is too large")]
    TooLarge(String),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
