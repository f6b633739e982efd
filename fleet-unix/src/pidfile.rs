//! Pid file records.
//!
//! A pid file holds either nothing or the decimal pid of the process that
//! owns a component. The file's presence is live-process advisory state:
//! it is truncated rather than deleted when the process is told to stop, so
//! an empty file means "installed, not running".
//!
//! Readers take a shared `flock` and writers an exclusive one, so a reader
//! never observes a half-written value from another fleet tool. Processes
//! that write the file without locking are not covered.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PidFileError {
    #[error("Did not find the expected file {}", .0.display())]
    Missing(PathBuf),

    #[error("pid file {} does not contain a valid pid: {content:?}", path.display())]
    InvalidContent { path: PathBuf, content: String },

    #[error("cannot lock pid file {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },

    #[error("I/O error on pid file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PidFileError>;

/// Content of a pid file. `pid` is `None` for an empty file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PidRecord {
    pub pid: Option<u32>,
}

impl PidRecord {
    pub fn empty() -> Self {
        Self { pid: None }
    }

    pub fn with_pid(pid: u32) -> Self {
        Self { pid: Some(pid) }
    }

    pub fn is_empty(&self) -> bool {
        self.pid.is_none()
    }

    /// Parse pid file content. Whitespace-only content is an empty record.
    /// Zero, negative and out-of-range values are rejected: they would
    /// address a process group or every process when handed to `kill(2)`.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }

        match trimmed.parse::<i32>() {
            Ok(pid) if pid > 0 => Ok(Self::with_pid(pid as u32)),
            _ => Err(PidFileError::InvalidContent {
                path: path.to_path_buf(),
                content: trimmed.to_string(),
            }),
        }
    }
}

/// Reads, writes and truncates pid files.
#[derive(Debug, Default, Clone, Copy)]
pub struct PidFileStore;

impl PidFileStore {
    pub fn new() -> Self {
        Self
    }

    /// Read the record stored at `path`.
    pub fn read(&self, path: &Path) -> Result<PidRecord> {
        let file = open_existing(path, OpenOptions::new().read(true))?;
        let mut locked = lock(file, FlockArg::LockShared, path)?;

        let mut content = String::new();
        locked
            .read_to_string(&mut content)
            .map_err(|source| io_error(path, source))?;

        PidRecord::parse(path, &content)
    }

    /// Truncate the file to empty, keeping it in place.
    pub fn clear(&self, path: &Path) -> Result<()> {
        let file = open_existing(path, OpenOptions::new().write(true))?;
        let locked = lock(file, FlockArg::LockExclusive, path)?;

        // Truncate only once the lock is held; `O_TRUNC` at open time would
        // race with a concurrent reader.
        locked.set_len(0).map_err(|source| io_error(path, source))?;
        debug!("Cleared pid file {}", path.display());
        Ok(())
    }

    /// Replace the file's content with `pid`, creating it if needed.
    pub fn write(&self, path: &Path, pid: u32) -> Result<()> {
        if pid == 0 || pid > i32::MAX as u32 {
            return Err(PidFileError::InvalidContent {
                path: path.to_path_buf(),
                content: pid.to_string(),
            });
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o644)
            .open(path)
            .map_err(|source| io_error(path, source))?;
        let mut locked = lock(file, FlockArg::LockExclusive, path)?;

        locked.set_len(0).map_err(|source| io_error(path, source))?;
        locked
            .write_all(pid.to_string().as_bytes())
            .and_then(|_| locked.sync_data())
            .map_err(|source| io_error(path, source))?;
        debug!("Wrote pid {} to {}", pid, path.display());
        Ok(())
    }
}

fn open_existing(path: &Path, options: &OpenOptions) -> Result<File> {
    options.open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            PidFileError::Missing(path.to_path_buf())
        } else {
            io_error(path, source)
        }
    })
}

fn lock(file: File, arg: FlockArg, path: &Path) -> Result<Flock<File>> {
    Flock::lock(file, arg).map_err(|(_, errno)| PidFileError::Lock {
        path: path.to_path_buf(),
        source: errno,
    })
}

fn io_error(path: &Path, source: std::io::Error) -> PidFileError {
    PidFileError::Io {
        path: path.to_path_buf(),
        source,
    }
}
