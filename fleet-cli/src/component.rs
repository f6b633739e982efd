//! Component instances installed in a directory.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::ComponentError;

/// Marker file naming the kind of component installed in a directory.
pub const MARKER_FILE: &str = ".fleet-component";

/// Pid file of a component, relative to its directory.
pub const DEFAULT_PID_FILE: &str = "pidfile";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    Server,
    LoadBalancer,
    AdminUi,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Server => "server",
            ComponentKind::LoadBalancer => "load-balancer",
            ComponentKind::AdminUi => "admin-ui",
        }
    }

    /// Warning emitted when there is nothing to stop in `dir`.
    pub fn not_running_message(&self, dir: &Path) -> String {
        let dir = dir.display();
        match self {
            ComponentKind::Server => format!("No server running in {}", dir),
            ComponentKind::LoadBalancer => {
                format!("Load-balancer and agent in {} are not running", dir)
            }
            ComponentKind::AdminUi => format!("No admin UI running in {}", dir),
        }
    }

    pub fn stopped_message(&self, dir: &Path) -> String {
        let dir = dir.display();
        match self {
            ComponentKind::Server => format!("Stopped server in {}", dir),
            ComponentKind::LoadBalancer => format!("Stopped load-balancer and agent in {}", dir),
            ComponentKind::AdminUi => format!("Stopped admin UI in {}", dir),
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct Marker {
    kind: ComponentKind,
    #[serde(default)]
    name: Option<String>,
}

/// One installed component. Identity is directory plus kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInstance {
    pub name: String,
    pub kind: ComponentKind,
    pub directory: PathBuf,
    pub pid_file_path: PathBuf,
}

impl ComponentInstance {
    /// A component of `kind` in `directory`, named after the directory.
    pub fn new(kind: ComponentKind, directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let name = directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| kind.as_str().to_string());
        let pid_file_path = directory.join(DEFAULT_PID_FILE);
        Self {
            name,
            kind,
            directory,
            pid_file_path,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Identify the component in `directory`. An explicit `kind` wins over
    /// the directory's marker file.
    pub fn detect(
        directory: &Path,
        kind: Option<ComponentKind>,
    ) -> Result<Self, ComponentError> {
        if !directory.is_dir() {
            return Err(ComponentError::NotADirectory(directory.to_path_buf()));
        }
        let absolute = std::path::absolute(directory).map_err(|source| ComponentError::Resolve {
            path: directory.to_path_buf(),
            source,
        })?;
        let directory = absolute.as_path();

        let marker = read_marker(directory)?;
        let kind = match (kind, &marker) {
            (Some(kind), _) => kind,
            (None, Some(marker)) => marker.kind,
            (None, None) => return Err(ComponentError::UnknownKind(directory.to_path_buf())),
        };

        let instance = Self::new(kind, directory);
        Ok(match marker.and_then(|m| m.name) {
            Some(name) => instance.with_name(name),
            None => instance,
        })
    }
}

fn read_marker(directory: &Path) -> Result<Option<Marker>, ComponentError> {
    let path = directory.join(MARKER_FILE);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(ComponentError::MarkerRead { path, source }),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| ComponentError::MarkerParse { path, source })
}
