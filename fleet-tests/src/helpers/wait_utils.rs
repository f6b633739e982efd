//! Async utilities to wait for sockets and processes

use std::path::Path;
use std::time::Duration;
use tokio::time::{Instant, sleep};

use fleet_unix::process_exists;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug)]
pub enum WaitError {
    Timeout,
}

impl std::fmt::Display for WaitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitError::Timeout => write!(f, "Wait operation timed out"),
        }
    }
}

impl std::error::Error for WaitError {}

/// Wait until `cond` holds, polling
async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> Result<(), WaitError> {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(WaitError::Timeout);
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Wait for a socket file to appear
pub async fn wait_for_socket(path: &Path, timeout: Duration) -> Result<(), WaitError> {
    wait_until(timeout, || path.exists()).await
}

/// Wait for a process to be gone. Only meaningful for processes that are
/// not our own unreaped children.
pub async fn wait_for_exit(pid: u32, timeout: Duration) -> Result<(), WaitError> {
    wait_until(timeout, || !process_exists(pid)).await
}
