//! Supervisor configuration.
//!
//! Each component directory carries `config/supervisor.yaml` describing the
//! programs its supervisor runs:
//!
//! ```yaml
//! socket: supervisor.sock
//! programs:
//!   - name: server-1
//!     command: ["./bin/server", "--port", "17010"]
//!     port: 17010
//!     pid_file: pidfile
//!     stop_signal: SIGTERM
//!     stop_timeout: 5s
//! ```
//!
//! Relative paths are resolved against the component directory.

mod duration;

pub use duration::{format_duration, parse_duration};

use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fleet_unix::parse_signal_name;

use crate::errors::{Result, SupervisorError};

/// Location of the config file inside a component directory.
pub const CONFIG_RELATIVE_PATH: &str = "config/supervisor.yaml";

pub const DEFAULT_SOCKET: &str = "supervisor.sock";

const DEFAULT_STOP_SIGNAL: &str = "SIGTERM";

const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

fn default_socket() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET)
}

fn default_stop_signal() -> String {
    DEFAULT_STOP_SIGNAL.to_string()
}

fn default_stop_timeout() -> Duration {
    DEFAULT_STOP_TIMEOUT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupervisorConfig {
    #[serde(default = "default_socket")]
    pub socket: PathBuf,
    #[serde(default)]
    pub programs: Vec<ProgramConfig>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            socket: default_socket(),
            programs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramConfig {
    pub name: String,
    /// argv; the first element is the executable
    pub command: Vec<String>,
    pub port: u16,
    #[serde(default)]
    pub pid_file: Option<PathBuf>,
    /// stdout/stderr are appended here; discarded when unset
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_stop_signal")]
    pub stop_signal: String,
    #[serde(default = "default_stop_timeout", with = "duration")]
    pub stop_timeout: Duration,
}

impl ProgramConfig {
    pub fn new(name: impl Into<String>, command: Vec<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            command,
            port,
            pid_file: None,
            log_file: None,
            stop_signal: default_stop_signal(),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    /// The configured stop signal. Falls back to SIGTERM for names that
    /// `validate` would have rejected.
    pub fn stop_signal(&self) -> Signal {
        parse_signal_name(&self.stop_signal).unwrap_or(Signal::SIGTERM)
    }

    pub fn pid_file_path(&self, component_dir: &Path) -> Option<PathBuf> {
        self.pid_file.as_ref().map(|p| component_dir.join(p))
    }

    pub fn log_file_path(&self, component_dir: &Path) -> Option<PathBuf> {
        self.log_file.as_ref().map(|p| component_dir.join(p))
    }
}

impl SupervisorConfig {
    pub fn path(component_dir: &Path) -> PathBuf {
        component_dir.join(CONFIG_RELATIVE_PATH)
    }

    /// Load and validate the config of the component in `component_dir`.
    pub fn load(component_dir: &Path) -> Result<Self> {
        let path = Self::path(component_dir);
        let contents = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SupervisorError::ConfigNotFound(path.clone())
            } else {
                SupervisorError::Io(e)
            }
        })?;
        Self::parse(&path, &contents)
    }

    pub fn parse(path: &Path, contents: &str) -> Result<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(contents);
        let config: SupervisorConfig =
            serde_path_to_error::deserialize(deserializer).map_err(|source| {
                SupervisorError::ConfigParse {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        let mut ports = HashSet::new();

        for program in &self.programs {
            if program.name.trim().is_empty() {
                return Err(SupervisorError::Config("program name must not be empty".into()));
            }
            if !names.insert(program.name.as_str()) {
                return Err(SupervisorError::Config(format!(
                    "duplicate program name '{}'",
                    program.name
                )));
            }
            if !ports.insert(program.port) {
                return Err(SupervisorError::Config(format!(
                    "port {} is used by more than one program",
                    program.port
                )));
            }
            if program.command.is_empty() {
                return Err(SupervisorError::Config(format!(
                    "program '{}' has an empty command",
                    program.name
                )));
            }
            if parse_signal_name(&program.stop_signal).is_none() {
                return Err(SupervisorError::Config(format!(
                    "program '{}' has unknown stop signal '{}'",
                    program.name, program.stop_signal
                )));
            }
        }
        Ok(())
    }

    /// Socket path for this config, resolved against `component_dir`.
    pub fn socket_path(&self, component_dir: &Path) -> PathBuf {
        component_dir.join(&self.socket)
    }
}
