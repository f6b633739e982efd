//! In-process supervisor for integration tests

use nix::sys::signal::Signal;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;

use fleet_protocol::errors::ServerError;
use fleet_protocol::server::ShutdownTx;
use fleet_supervisor::Supervisor;
use fleet_supervisor::state::SharedState;

use crate::helpers::wait_utils::wait_for_socket;

const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs a component's supervisor on the current runtime. Programs that are
/// still alive when the harness is dropped get SIGKILL.
pub struct TestSupervisorHarness {
    state: SharedState,
    socket_path: PathBuf,
    shutdown_tx: ShutdownTx,
    task: Option<JoinHandle<Result<(), ServerError>>>,
}

impl TestSupervisorHarness {
    /// Load the supervisor of `component_dir`, start its programs and
    /// serve its socket.
    pub async fn start(component_dir: &Path) -> Self {
        Self::start_with(component_dir, true).await
    }

    /// Serve the socket without starting any program
    pub async fn start_idle(component_dir: &Path) -> Self {
        Self::start_with(component_dir, false).await
    }

    async fn start_with(component_dir: &Path, start_programs: bool) -> Self {
        let supervisor = Supervisor::load(component_dir).expect("failed to load supervisor");
        if start_programs {
            supervisor.start_programs().await;
        }

        let server = supervisor.server();
        let shutdown_tx = server.shutdown_handle();
        let socket_path = supervisor.socket_path();
        let task = tokio::spawn(server.run());

        wait_for_socket(&socket_path, STARTUP_TIMEOUT)
            .await
            .expect("supervisor socket never appeared");

        Self {
            state: supervisor.state(),
            socket_path,
            shutdown_tx,
            task: Some(task),
        }
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Live pid of the program called `name`
    pub fn pid_of(&self, name: &str) -> Option<u32> {
        self.state.read().programs.get(name).and_then(|p| p.live_pid())
    }

    /// Wait for the server to exit on its own (after a `Stop` request)
    pub async fn wait_for_exit(&mut self, timeout: Duration) -> bool {
        let Some(task) = self.task.take() else {
            return true;
        };
        matches!(tokio::time::timeout(timeout, task).await, Ok(Ok(Ok(()))))
    }

    /// Stop the programs and the server
    pub async fn shutdown(mut self) {
        let _ = fleet_supervisor::process::stop_all(self.state.clone()).await;
        let _ = self.shutdown_tx.send(()).await;
        self.wait_for_exit(STARTUP_TIMEOUT).await;
    }
}

impl Drop for TestSupervisorHarness {
    fn drop(&mut self) {
        let pids: Vec<u32> = self
            .state
            .read()
            .programs
            .values()
            .filter_map(|p| p.live_pid())
            .collect();
        for pid in pids {
            let _ = fleet_unix::send_signal(pid, Signal::SIGKILL);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
