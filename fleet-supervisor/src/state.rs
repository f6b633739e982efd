use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

use fleet_protocol::protocol::{ProgramInfo, StatusSnapshot, SupervisorInfo};

use crate::config::{ProgramConfig, SupervisorConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramStatus {
    Stopped,
    Running,
    Stopping,
    Exited,
}

impl ProgramStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramStatus::Stopped => "stopped",
            ProgramStatus::Running => "running",
            ProgramStatus::Stopping => "stopping",
            ProgramStatus::Exited => "exited",
        }
    }

    /// Whether the program still has a live process.
    pub fn is_live(&self) -> bool {
        matches!(self, ProgramStatus::Running | ProgramStatus::Stopping)
    }
}

#[derive(Debug, Clone)]
pub struct ProgramState {
    pub config: ProgramConfig,
    pub status: ProgramStatus,
    pub pid: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
}

impl ProgramState {
    pub fn new(config: ProgramConfig) -> Self {
        Self {
            config,
            status: ProgramStatus::Stopped,
            pid: None,
            started_at: None,
            exit_code: None,
        }
    }

    /// Pid reported to status queries; only live programs have one.
    pub fn live_pid(&self) -> Option<u32> {
        if self.status.is_live() { self.pid } else { None }
    }

    pub fn to_info(&self) -> ProgramInfo {
        ProgramInfo {
            name: self.config.name.clone(),
            port: self.config.port,
            pid: self.live_pid(),
            started_at: self.started_at,
            exit_code: self.exit_code,
        }
    }
}

/// Handle of a spawned program. The monitor task owns the child and
/// finishes once it has been reaped.
pub struct ProcessHandle {
    pub pid: u32,
    pub monitor: JoinHandle<()>,
}

pub struct SupervisorState {
    pub component_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    /// Programs keyed by name
    pub programs: BTreeMap<String, ProgramState>,
    pub processes: HashMap<String, ProcessHandle>,
}

impl SupervisorState {
    pub fn new(component_dir: PathBuf, config: &SupervisorConfig) -> Self {
        let programs = config
            .programs
            .iter()
            .map(|p| (p.name.clone(), ProgramState::new(p.clone())))
            .collect();
        Self {
            component_dir,
            started_at: Utc::now(),
            programs,
            processes: HashMap::new(),
        }
    }

    /// Every configured port, mapped to its live pid.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.programs
            .values()
            .map(|p| (p.config.port, p.live_pid()))
            .collect()
    }

    pub fn info(&self) -> SupervisorInfo {
        let uptime = Utc::now().signed_duration_since(self.started_at);
        SupervisorInfo {
            pid: std::process::id(),
            component_dir: self.component_dir.clone(),
            uptime_secs: uptime.num_seconds().max(0) as u64,
            programs: self.programs.values().map(ProgramState::to_info).collect(),
        }
    }
}

pub type SharedState = Arc<RwLock<SupervisorState>>;

pub fn new_shared_state(component_dir: PathBuf, config: &SupervisorConfig) -> SharedState {
    Arc::new(RwLock::new(SupervisorState::new(component_dir, config)))
}
