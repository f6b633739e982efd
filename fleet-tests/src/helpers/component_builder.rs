//! Component directories built on a temp dir

use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use fleet_cli::component::{DEFAULT_PID_FILE, MARKER_FILE};
use fleet_cli::hooks::LB_AGENT_CONFIG;
use fleet_cli::{ComponentInstance, ComponentKind, StopContext};
use fleet_supervisor::config::{CONFIG_RELATIVE_PATH, ProgramConfig, SupervisorConfig};

/// Builder for a component directory with a supervisor config
pub struct TestComponentBuilder {
    kind: ComponentKind,
    name: Option<String>,
    marker: bool,
    programs: Vec<ProgramConfig>,
    lb_pid_file: Option<String>,
}

impl TestComponentBuilder {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            name: None,
            marker: true,
            programs: Vec::new(),
            lb_pid_file: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Leave the marker file out; the kind then has to be passed explicitly
    pub fn without_marker(mut self) -> Self {
        self.marker = false;
        self
    }

    /// Add a long-running program that records its pid in `<name>.pid`
    pub fn add_program(self, name: &str, port: u16) -> Self {
        let mut program =
            ProgramConfig::new(name, vec!["sleep".to_string(), "30".to_string()], port);
        program.pid_file = Some(PathBuf::from(format!("{}.pid", name)));
        program.stop_timeout = Duration::from_secs(2);
        self.add_program_config(program)
    }

    pub fn add_program_config(mut self, program: ProgramConfig) -> Self {
        self.programs.push(program);
        self
    }

    /// Write `config/repo/lb-agent.conf` pointing at `pid_file`
    pub fn with_lb_agent_config(mut self, pid_file: &str) -> Self {
        self.lb_pid_file = Some(pid_file.to_string());
        self
    }

    pub fn build(self) -> TestComponent {
        let dir = TempDir::new().expect("failed to create temp dir");
        let root = dir.path();

        let config = SupervisorConfig {
            programs: self.programs,
            ..SupervisorConfig::default()
        };
        let config_path = root.join(CONFIG_RELATIVE_PATH);
        std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        std::fs::write(&config_path, serde_yaml::to_string(&config).unwrap()).unwrap();

        if self.marker {
            let mut marker = serde_json::json!({ "kind": self.kind });
            if let Some(name) = &self.name {
                marker["name"] = serde_json::Value::from(name.as_str());
            }
            std::fs::write(root.join(MARKER_FILE), marker.to_string()).unwrap();
        }

        if let Some(pid_file) = &self.lb_pid_file {
            let path = root.join(LB_AGENT_CONFIG);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            let agent = serde_json::json!({ "pid_file": pid_file, "port": 20151 });
            std::fs::write(path, agent.to_string()).unwrap();
        }

        TestComponent {
            dir,
            kind: self.kind,
            config,
        }
    }
}

/// A component directory that is removed when dropped
pub struct TestComponent {
    dir: TempDir,
    pub kind: ComponentKind,
    pub config: SupervisorConfig,
}

impl TestComponent {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn instance(&self) -> ComponentInstance {
        ComponentInstance::detect(self.path(), Some(self.kind)).unwrap()
    }

    pub fn context(&self) -> StopContext {
        StopContext::new(self.instance())
    }

    /// The component's own pid file
    pub fn pid_file(&self) -> PathBuf {
        self.path().join(DEFAULT_PID_FILE)
    }

    /// Pid file of a program added with `add_program`
    pub fn program_pid_file(&self, program: &str) -> PathBuf {
        self.path().join(format!("{}.pid", program))
    }

    /// Resolve a path relative to the component directory
    pub fn join(&self, relative: &str) -> PathBuf {
        self.path().join(relative)
    }

    pub fn socket_path(&self) -> PathBuf {
        self.config.socket_path(self.path())
    }
}
