//! Work done right before a component's supervisor is told to stop.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::component::ComponentKind;
use crate::context::StopContext;
use crate::dispatcher::{SignalDispatcher, SignalKind};
use crate::errors::HookError;

/// Load-balancer agent config, relative to the component directory.
pub const LB_AGENT_CONFIG: &str = "config/repo/lb-agent.conf";

pub trait PreStopHook: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, ctx: &StopContext, dispatcher: &SignalDispatcher) -> Result<(), HookError>;
}

/// Pre-stop hooks keyed by component kind.
#[derive(Default)]
pub struct PreStopHooks {
    hooks: HashMap<ComponentKind, Box<dyn PreStopHook>>,
}

impl PreStopHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The hooks every fleet component kind needs.
    pub fn with_defaults() -> Self {
        let mut hooks = Self::new();
        hooks.register(ComponentKind::LoadBalancer, LoadBalancerAgentHook);
        hooks
    }

    /// Register `hook` for `kind`, replacing any previous one.
    pub fn register(&mut self, kind: ComponentKind, hook: impl PreStopHook + 'static) {
        self.hooks.insert(kind, Box::new(hook));
    }

    pub fn get(&self, kind: ComponentKind) -> Option<&dyn PreStopHook> {
        self.hooks.get(&kind).map(|hook| hook.as_ref())
    }
}

#[derive(Debug, Deserialize)]
struct LbAgentConfig {
    pid_file: PathBuf,
}

/// Stops the load-balancer process the agent manages: reads its pid file
/// location from the agent config and sends it SIGUSR1.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadBalancerAgentHook;

impl LoadBalancerAgentHook {
    /// Absolute path of the load-balancer's pid file.
    pub fn pid_file_path(component_dir: &Path) -> Result<PathBuf, HookError> {
        let path = component_dir.join(LB_AGENT_CONFIG);
        let contents = std::fs::read_to_string(&path).map_err(|source| HookError::ConfigRead {
            path: path.clone(),
            source,
        })?;
        let config: LbAgentConfig = serde_json::from_str(&contents)
            .map_err(|source| HookError::ConfigParse { path: path.clone(), source })?;

        let pid_file = component_dir.join(config.pid_file);
        std::path::absolute(&pid_file).map_err(|source| HookError::ConfigRead { path, source })
    }
}

impl PreStopHook for LoadBalancerAgentHook {
    fn name(&self) -> &str {
        "load-balancer"
    }

    fn run(&self, ctx: &StopContext, dispatcher: &SignalDispatcher) -> Result<(), HookError> {
        let pid_file = Self::pid_file_path(&ctx.component.directory)?;
        debug!("Stopping load-balancer recorded in {}", pid_file.display());

        match dispatcher.signal_pid_file(self.name(), &pid_file, SignalKind::Stop) {
            Ok(()) => Ok(()),
            Err(e) if e.is_recoverable() => {
                warn!("Load-balancer was already stopped: {}", e);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
