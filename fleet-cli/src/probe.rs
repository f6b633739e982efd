//! Queries to a component's supervising daemon.

use std::path::Path;
use tracing::debug;

use fleet_protocol::client::Client;
use fleet_protocol::protocol::{Response, ResponseData, StatusSnapshot, SupervisorInfo};

use crate::component::ComponentInstance;
use crate::errors::StopError;

/// Live port to pid mapping of a component.
#[allow(async_fn_in_trait)]
pub trait ComponentStatusProbe {
    async fn status(&self, component: &ComponentInstance) -> Result<StatusSnapshot, StopError>;
}

/// The supervisor's generic stop.
#[allow(async_fn_in_trait)]
pub trait SupervisorCommand {
    async fn stop(&self, component: &ComponentInstance) -> Result<(), StopError>;
}

/// Talks to the supervisor over its Unix socket, one connection per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct SupervisorClient;

impl SupervisorClient {
    pub fn new() -> Self {
        Self
    }

    /// Connect to the supervisor of `component_dir`. `None` when no
    /// supervisor is listening.
    async fn connect(&self, component_dir: &Path) -> Result<Option<Client>, StopError> {
        let socket_path = fleet_supervisor::socket_path(component_dir)?;
        match Client::connect(&socket_path).await {
            Ok(client) => Ok(Some(client)),
            Err(e) if e.is_not_listening() => {
                debug!("No supervisor listening on {}: {}", socket_path.display(), e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Programs of the supervisor in `component_dir`, if it is running.
    pub async fn programs(&self, component_dir: &Path) -> Result<Option<SupervisorInfo>, StopError> {
        let Some(client) = self.connect(component_dir).await? else {
            return Ok(None);
        };
        match client.list_programs().await? {
            Response::Ok {
                data: Some(ResponseData::Programs(info)),
                ..
            } => Ok(Some(info)),
            Response::Error { message } => Err(StopError::Supervisor(message)),
            Response::Ok { .. } => Err(StopError::UnexpectedResponse),
        }
    }
}

impl ComponentStatusProbe for SupervisorClient {
    async fn status(&self, component: &ComponentInstance) -> Result<StatusSnapshot, StopError> {
        let Some(client) = self.connect(&component.directory).await? else {
            return Ok(StatusSnapshot::empty());
        };
        match client.status().await? {
            Response::Ok {
                data: Some(ResponseData::Status(snapshot)),
                ..
            } => Ok(snapshot),
            Response::Error { message } => Err(StopError::Supervisor(message)),
            Response::Ok { .. } => Err(StopError::UnexpectedResponse),
        }
    }
}

impl SupervisorCommand for SupervisorClient {
    async fn stop(&self, component: &ComponentInstance) -> Result<(), StopError> {
        let Some(client) = self.connect(&component.directory).await? else {
            debug!("Supervisor of {} already gone", component.directory.display());
            return Ok(());
        };
        match client.stop().await? {
            Response::Ok { message, .. } => {
                if let Some(message) = message {
                    debug!("{}", message);
                }
                Ok(())
            }
            Response::Error { message } => Err(StopError::Supervisor(message)),
        }
    }
}

#[cfg(test)]
mod tests;
