use std::path::PathBuf;
use thiserror::Error;

use fleet_protocol::errors::{AdminRpcError, ClientError};
use fleet_supervisor::errors::SupervisorError;
use fleet_unix::{PidFileError, SignalSendError};

use crate::exit_codes::ExitCodes;

#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("Component directory {0} does not exist")]
    NotADirectory(PathBuf),

    #[error("Cannot resolve component directory {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read component marker {path}: {source}")]
    MarkerRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid component marker {path}: {source}")]
    MarkerParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot tell which kind of component lives in {0}, pass --kind")]
    UnknownKind(PathBuf),
}

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Did not find the expected file {path}, quitting now")]
    FileMissing { path: PathBuf },

    #[error("Did not attempt to stop the {component} because the file {path} is empty")]
    EmptyPidFile { component: String, path: PathBuf },

    #[error("Pid file {path} holds {content:?}, which is not a valid pid")]
    InvalidPid { path: PathBuf, content: String },

    #[error("Process {pid} of the {component} (from {path}) does not exist")]
    ProcessNotFound {
        component: String,
        pid: u32,
        path: PathBuf,
    },

    #[error(transparent)]
    PidFile(PidFileError),

    #[error(transparent)]
    Send(#[from] SignalSendError),
}

impl SignalError {
    /// Errors the caller may carry on after.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SignalError::ProcessNotFound { .. })
    }

    pub fn exit_code(&self, codes: &ExitCodes) -> i32 {
        match self {
            SignalError::FileMissing { .. } => codes.file_missing,
            SignalError::EmptyPidFile { .. } => codes.no_pid_found,
            _ => codes.generic,
        }
    }
}

impl From<PidFileError> for SignalError {
    fn from(e: PidFileError) -> Self {
        match e {
            PidFileError::Missing(path) => SignalError::FileMissing { path },
            PidFileError::InvalidContent { path, content } => {
                SignalError::InvalidPid { path, content }
            }
            other => SignalError::PidFile(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("Failed to read {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Signal(#[from] SignalError),
}

#[derive(Debug, Error)]
pub enum StopError {
    #[error("Cannot locate the supervisor: {0}")]
    SupervisorConfig(#[from] SupervisorError),

    #[error("Cannot talk to the supervisor: {0}")]
    Client(#[from] ClientError),

    #[error("Supervisor error: {0}")]
    Supervisor(String),

    #[error("Unexpected response from the supervisor")]
    UnexpectedResponse,

    #[error(transparent)]
    PreStopHook(#[from] HookError),
}

impl StopError {
    pub fn exit_code(&self, codes: &ExitCodes) -> i32 {
        match self {
            StopError::PreStopHook(HookError::Signal(e)) => e.exit_code(codes),
            _ => codes.generic,
        }
    }

    /// Whether the error was already logged where it happened.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            StopError::PreStopHook(HookError::Signal(
                SignalError::FileMissing { .. } | SignalError::EmptyPidFile { .. }
            ))
        )
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Stop(#[from] StopError),

    #[error(transparent)]
    Admin(#[from] AdminRpcError),

    #[error("Invalid JSON document: {0}")]
    Document(#[source] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self, codes: &ExitCodes) -> i32 {
        match self {
            CliError::Stop(e) => e.exit_code(codes),
            CliError::Signal(e) => e.exit_code(codes),
            _ => codes.generic,
        }
    }

    pub fn is_reported(&self) -> bool {
        match self {
            CliError::Stop(e) => e.is_reported(),
            CliError::Signal(e) => matches!(
                e,
                SignalError::FileMissing { .. } | SignalError::EmptyPidFile { .. }
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
