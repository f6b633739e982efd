use tracing::{debug, info};

use fleet_protocol::protocol::{Request, Response, ResponseData};
use fleet_protocol::server::ShutdownTx;

use crate::process::stop_all;
use crate::state::SharedState;

/// Handle one control-plane request.
pub async fn handle_request(
    request: Request,
    state: SharedState,
    shutdown_tx: ShutdownTx,
) -> Response {
    debug!("Handling {} request", request.variant_name());

    match request {
        Request::Ping => Response::ok_with_message("pong"),

        Request::Status => {
            let snapshot = state.read().snapshot();
            Response::ok_with_data(ResponseData::Status(snapshot))
        }

        Request::ListPrograms => {
            let info = state.read().info();
            Response::ok_with_data(ResponseData::Programs(info))
        }

        Request::Stop => {
            let dir = state.read().component_dir.clone();
            info!("Stop requested for {}", dir.display());
            let result = stop_all(state).await;
            let _ = shutdown_tx.send(()).await;
            match result {
                Ok(()) => Response::ok_with_message(format!("Stopped {}", dir.display())),
                Err(e) => Response::error(format!("Failed to stop {}: {}", dir.display(), e)),
            }
        }

        Request::Shutdown => {
            info!("Shutdown requested, supervised programs keep running");
            let _ = shutdown_tx.send(()).await;
            Response::ok_with_message("Supervisor shutting down")
        }
    }
}

#[cfg(test)]
mod tests;
