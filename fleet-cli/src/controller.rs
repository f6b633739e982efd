//! Stopping a component.
//!
//! A stop checks the supervisor's status first. A component with no live
//! program is left alone; otherwise the kind's pre-stop hook runs, then the
//! supervisor is told to stop. Errors are not caught here, the CLI maps
//! them to exit codes.

use tracing::{Instrument, debug, info, warn};

use crate::context::StopContext;
use crate::dispatcher::SignalDispatcher;
use crate::errors::StopError;
use crate::hooks::PreStopHooks;
use crate::probe::{ComponentStatusProbe, SupervisorCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    NothingToStop,
    Stopped,
}

pub struct StopController<S> {
    supervisor: S,
    hooks: PreStopHooks,
    dispatcher: SignalDispatcher,
}

impl<S> StopController<S>
where
    S: ComponentStatusProbe + SupervisorCommand,
{
    pub fn new(supervisor: S, hooks: PreStopHooks) -> Self {
        Self {
            supervisor,
            hooks,
            dispatcher: SignalDispatcher::new(),
        }
    }

    pub async fn stop(&self, ctx: &StopContext) -> Result<StopOutcome, StopError> {
        self.run(ctx).instrument(ctx.span.clone()).await
    }

    async fn run(&self, ctx: &StopContext) -> Result<StopOutcome, StopError> {
        let component = &ctx.component;

        let snapshot = self.supervisor.status(component).await?;
        debug!("Status of {}: {:?}", component.directory.display(), snapshot.port_to_pid);
        let pids: Vec<u32> = snapshot.running_pids().collect();
        if pids.is_empty() {
            if ctx.show_output {
                warn!("{}", component.kind.not_running_message(&component.directory));
            }
            return Ok(StopOutcome::NothingToStop);
        }

        if let Some(hook) = self.hooks.get(component.kind) {
            debug!("Running {} pre-stop hook", hook.name());
            hook.run(ctx, &self.dispatcher)?;
        }

        debug!("Asking the supervisor to stop PIDs {:?}", pids);
        self.supervisor.stop(component).await?;
        if ctx.show_output {
            info!("{}", component.kind.stopped_message(&component.directory));
        }
        Ok(StopOutcome::Stopped)
    }
}
