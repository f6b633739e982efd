//! Pid-file based signal delivery.

use nix::sys::signal::Signal;
use std::path::Path;
use tracing::{debug, error, warn};

use fleet_unix::{Delivery, PidFileError, PidFileStore, send_signal};

use crate::component::ComponentInstance;
use crate::errors::SignalError;

/// Lifecycle action expressed as a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SignalKind {
    /// SIGUSR1, the load-balancer's graceful stop
    Stop,
    Terminate,
    Reload,
}

impl SignalKind {
    pub fn signal(&self) -> Signal {
        match self {
            SignalKind::Stop => Signal::SIGUSR1,
            SignalKind::Terminate => Signal::SIGTERM,
            SignalKind::Reload => Signal::SIGHUP,
        }
    }
}

#[derive(Debug, Default)]
pub struct SignalDispatcher {
    store: PidFileStore,
}

impl SignalDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the process recorded in `component`'s own pid file.
    pub fn signal(
        &self,
        component: &ComponentInstance,
        kind: SignalKind,
    ) -> Result<(), SignalError> {
        self.signal_pid_file(&component.name, &component.pid_file_path, kind)
    }

    /// Signal the process recorded in `path` and truncate the file once
    /// the signal is sent. The file is truncated too when the process is
    /// already gone, and `ProcessNotFound` is returned.
    pub fn signal_pid_file(
        &self,
        component: &str,
        path: &Path,
        kind: SignalKind,
    ) -> Result<(), SignalError> {
        let record = self.store.read(path).map_err(|e| {
            let e = SignalError::from(e);
            if matches!(e, SignalError::FileMissing { .. }) {
                error!("{}", e);
            }
            e
        })?;

        let Some(pid) = record.pid else {
            let e = SignalError::EmptyPidFile {
                component: component.to_string(),
                path: path.to_path_buf(),
            };
            error!("{}", e);
            return Err(e);
        };

        let signal = kind.signal();
        debug!(
            "Will now send {} to pid {} (as found in the {} file)",
            signal,
            pid,
            path.display()
        );

        match send_signal(pid, signal)? {
            Delivery::Delivered => {
                self.clear(path)?;
                Ok(())
            }
            Delivery::NoSuchProcess => {
                self.clear(path)?;
                let e = SignalError::ProcessNotFound {
                    component: component.to_string(),
                    pid,
                    path: path.to_path_buf(),
                };
                warn!("{}", e);
                Err(e)
            }
        }
    }

    fn clear(&self, path: &Path) -> Result<(), SignalError> {
        match self.store.clear(path) {
            Ok(()) => Ok(()),
            Err(e @ PidFileError::Missing(_)) => {
                warn!("Pid file vanished before it could be cleared: {}", e);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
