//! Stand-in processes for pid file tests

use std::process::{Child, Command, ExitStatus};

/// A `sleep` child that is killed when dropped.
pub struct Sleeper {
    child: Child,
}

impl Sleeper {
    pub fn spawn() -> Self {
        let child = Command::new("sleep")
            .arg("30")
            .spawn()
            .expect("failed to spawn sleep");
        Self { child }
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Reap the child and return how it ended.
    pub fn wait(&mut self) -> ExitStatus {
        self.child.wait().expect("failed to wait for sleep")
    }

    /// Whether the child is still running, reaping it if it is not.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for Sleeper {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
