//! Per-component supervising daemon.
//!
//! A supervisor runs the programs listed in `<dir>/config/supervisor.yaml`,
//! keeps their pid files current and answers control-plane requests
//! (`Status`, `Stop`, ...) on a Unix socket inside the component directory.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use fleet_protocol::protocol::{Request, Response};
use fleet_protocol::server::{Server, ShutdownTx};

pub mod config;
pub mod errors;
pub mod handler;
pub mod process;
pub mod state;

use config::SupervisorConfig;
use errors::{Result, SupervisorError};
use state::{SharedState, new_shared_state};

/// Pid file of the supervisor itself, relative to the component directory.
pub const SUPERVISOR_PID_FILE: &str = "supervisor.pid";

pub type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Socket a component's supervisor listens on. Falls back to the default
/// socket name when the component has no supervisor config.
pub fn socket_path(component_dir: &Path) -> Result<PathBuf> {
    match SupervisorConfig::load(component_dir) {
        Ok(config) => Ok(config.socket_path(component_dir)),
        Err(SupervisorError::ConfigNotFound(_)) => {
            Ok(component_dir.join(config::DEFAULT_SOCKET))
        }
        Err(e) => Err(e),
    }
}

pub struct Supervisor {
    component_dir: PathBuf,
    config: SupervisorConfig,
    state: SharedState,
}

impl Supervisor {
    /// Load the supervisor of the component in `component_dir`.
    pub fn load(component_dir: &Path) -> Result<Self> {
        let config = SupervisorConfig::load(component_dir)?;
        Ok(Self::from_config(component_dir.to_path_buf(), config))
    }

    pub fn from_config(component_dir: PathBuf, config: SupervisorConfig) -> Self {
        let state = new_shared_state(component_dir.clone(), &config);
        Self {
            component_dir,
            config,
            state,
        }
    }

    pub fn component_dir(&self) -> &Path {
        &self.component_dir
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn socket_path(&self) -> PathBuf {
        self.config.socket_path(&self.component_dir)
    }

    pub fn pid_file_path(&self) -> PathBuf {
        self.component_dir.join(SUPERVISOR_PID_FILE)
    }

    /// Start every configured program; returns how many were started.
    pub async fn start_programs(&self) -> usize {
        process::start_all(self.state.clone()).await
    }

    pub async fn stop_programs(&self) -> Result<()> {
        process::stop_all(self.state.clone()).await
    }

    /// Control-plane server bound to this supervisor's state.
    pub fn server(
        &self,
    ) -> Server<impl Fn(Request, ShutdownTx) -> HandlerFuture + Send + Sync + 'static, HandlerFuture>
    {
        let state = self.state.clone();
        let handler = move |request: Request, shutdown_tx: ShutdownTx| -> HandlerFuture {
            let state = state.clone();
            Box::pin(handler::handle_request(request, state, shutdown_tx))
        };
        Server::new(self.socket_path(), handler)
    }
}
