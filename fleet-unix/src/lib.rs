//! Unix plumbing shared by the fleet CLI and the component supervisor.
//!
//! - `pidfile` - advisory pid files guarded by `flock`
//! - `signal` - signal name parsing and delivery
//! - `process` - session and credential helpers

#[cfg(not(unix))]
compile_error!("fleet-unix only supports unix targets");

pub mod pidfile;
pub mod process;
pub mod signal;

pub use pidfile::{PidFileError, PidFileStore, PidRecord};
pub use signal::{Delivery, SignalSendError, parse_signal_name, process_exists, send_signal};
