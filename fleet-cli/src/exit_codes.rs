//! Process exit codes of the `fleet` binary.

pub const SUCCESS: i32 = 0;
pub const GENERIC: i32 = 1;
/// Argument errors; clap exits with this code on its own.
pub const USAGE: i32 = 2;
pub const FILE_MISSING: i32 = 3;
pub const NO_PID_FOUND: i32 = 4;

/// Exit codes a stop run maps its failures to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes {
    pub success: i32,
    pub generic: i32,
    pub file_missing: i32,
    pub no_pid_found: i32,
}

impl Default for ExitCodes {
    fn default() -> Self {
        Self {
            success: SUCCESS,
            generic: GENERIC,
            file_missing: FILE_MISSING,
            no_pid_found: NO_PID_FOUND,
        }
    }
}
