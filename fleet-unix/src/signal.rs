//! Signal name parsing and delivery.

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalSendError {
    #[error("refusing to signal invalid pid {0}")]
    InvalidPid(u32),

    #[error("failed to send {signal} to pid {pid}: {source}")]
    Kill {
        pid: u32,
        signal: Signal,
        #[source]
        source: nix::Error,
    },
}

/// Result of a signal delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// `kill(2)` returned `ESRCH`.
    NoSuchProcess,
}

/// Parse a signal given as `SIGTERM`, `TERM`, `term` or `15`.
pub fn parse_signal_name(name: &str) -> Option<Signal> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    if let Ok(num) = name.parse::<i32>() {
        return Signal::try_from(num).ok();
    }

    let upper = name.to_ascii_uppercase();
    let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
    let signal = match bare {
        "HUP" => Signal::SIGHUP,
        "INT" => Signal::SIGINT,
        "QUIT" => Signal::SIGQUIT,
        "KILL" => Signal::SIGKILL,
        "USR1" => Signal::SIGUSR1,
        "USR2" => Signal::SIGUSR2,
        "TERM" => Signal::SIGTERM,
        "CONT" => Signal::SIGCONT,
        "STOP" => Signal::SIGSTOP,
        _ => return None,
    };
    Some(signal)
}

fn to_nix_pid(pid: u32) -> Result<Pid, SignalSendError> {
    // 0 and anything that wraps negative address process groups in kill(2)
    if pid == 0 || pid > i32::MAX as u32 {
        return Err(SignalSendError::InvalidPid(pid));
    }
    Ok(Pid::from_raw(pid as i32))
}

/// Send `signal` to a single process.
pub fn send_signal(pid: u32, signal: Signal) -> Result<Delivery, SignalSendError> {
    let nix_pid = to_nix_pid(pid)?;
    match kill(nix_pid, signal) {
        Ok(()) => Ok(Delivery::Delivered),
        Err(Errno::ESRCH) => Ok(Delivery::NoSuchProcess),
        Err(source) => Err(SignalSendError::Kill { pid, signal, source }),
    }
}

/// Check whether a process exists. A process owned by another user
/// (`EPERM`) still exists.
pub fn process_exists(pid: u32) -> bool {
    let Ok(nix_pid) = to_nix_pid(pid) else {
        return false;
    };
    matches!(kill(nix_pid, None), Ok(()) | Err(Errno::EPERM))
}
