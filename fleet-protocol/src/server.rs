use std::{future::Future, path::PathBuf, sync::Arc, time::Duration};

use tokio::{
    io::AsyncWriteExt,
    net::{UnixListener, UnixStream},
    sync::mpsc,
    task::JoinSet,
};
use tracing::{debug, error, info, warn};

use crate::{
    errors::ServerError,
    protocol::{
        Frame, MAX_MESSAGE_SIZE, Request, Response, ResponseEnvelope, decode_envelope,
        encode_response, read_frame,
    },
};

pub type Result<T> = std::result::Result<T, ServerError>;
pub type ShutdownTx = mpsc::Sender<()>;

/// Bounded channel capacity for the per-connection writer task.
const WRITER_CHANNEL_CAPACITY: usize = 64;

/// How long open connections may keep running once shutdown is requested.
/// Gives a `Stop` caller time to receive its response.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(2);

/// Whether a peer with `client_uid` may talk to a server running as `daemon_uid`.
fn peer_allowed(client_uid: u32, daemon_uid: u32) -> bool {
    client_uid == 0 || client_uid == daemon_uid
}

pub struct Server<F, Fut>
where
    F: Fn(Request, ShutdownTx) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send,
{
    socket_path: PathBuf,
    handler: Arc<F>,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl<F, Fut> Server<F, Fut>
where
    F: Fn(Request, ShutdownTx) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send,
{
    pub fn new(socket_path: PathBuf, handler: F) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Self {
            socket_path,
            handler: Arc::new(handler),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// A sender that stops the server, for callers outside request handling
    /// (signal handlers, tests).
    pub fn shutdown_handle(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    pub async fn run(mut self) -> Result<()> {
        // Reject symlinked socket path before any operations
        if let Ok(meta) = std::fs::symlink_metadata(&self.socket_path)
            && meta.file_type().is_symlink()
        {
            return Err(ServerError::SocketSymlink {
                socket_path: self.socket_path.clone(),
            });
        }

        // Remove stale socket file (atomic - avoid TOCTOU race)
        match std::fs::remove_file(&self.socket_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ServerError::StaleSocket {
                    socket_path: self.socket_path.clone(),
                    source: e,
                });
            }
        }

        let listener = UnixListener::bind(&self.socket_path).map_err(|e| ServerError::Bind {
            socket_path: self.socket_path.clone(),
            source: e,
        })?;

        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o660))
                .map_err(|e| ServerError::SocketPermissions {
                    socket_path: self.socket_path.clone(),
                    source: e,
                })?;
        }

        let daemon_uid = nix::unistd::getuid().as_raw();
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            let shutdown_tx = self.shutdown_tx.clone();
                            let handler = Arc::clone(&self.handler);

                            connections.spawn(async move {
                                if let Err(e) = handle_client(handler, stream, shutdown_tx, daemon_uid).await {
                                    debug!("Client handler error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = self.shutdown_rx.recv() => {
                    info!("Server shutdown requested");
                    break;
                }
            }
        }

        drop(listener);
        let drained = tokio::time::timeout(SHUTDOWN_DRAIN, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("Closing {} connection(s) still open at shutdown", connections.len());
            connections.abort_all();
        }

        if let Err(e) = std::fs::remove_file(&self.socket_path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Failed to remove socket {:?}: {}", self.socket_path, e);
        }

        Ok(())
    }
}

async fn handle_client<F, Fut>(
    handler: Arc<F>,
    stream: UnixStream,
    shutdown_tx: mpsc::Sender<()>,
    daemon_uid: u32,
) -> Result<()>
where
    F: Fn(Request, ShutdownTx) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send,
{
    debug!("Client connected");

    let cred = stream.peer_cred().map_err(ServerError::PeerCredentials)?;
    if !peer_allowed(cred.uid(), daemon_uid) {
        debug!(
            "Unauthorized connection attempt: UID {} (supervisor UID {})",
            cred.uid(),
            daemon_uid
        );
        return Err(ServerError::Unauthorized {
            client_uid: cred.uid(),
            daemon_uid,
        });
    }

    let (read_half, mut write_half) = stream.into_split();

    let (write_tx, mut write_rx) = mpsc::channel::<Vec<u8>>(WRITER_CHANNEL_CAPACITY);

    // Writer task: receives encoded bytes and writes to stream
    let writer_task = tokio::spawn(async move {
        while let Some(bytes) = write_rx.recv().await {
            if let Err(e) = write_half.write_all(&bytes).await {
                warn!("Failed to write to client: {}", e);
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });

    let mut reader = read_half;

    loop {
        let payload = match read_frame(&mut reader, MAX_MESSAGE_SIZE).await {
            Ok(Frame::Payload(payload)) => payload,
            Ok(Frame::Eof) => {
                debug!("Client disconnected (EOF)");
                drop(write_tx);
                let _ = writer_task.await;
                return Ok(());
            }
            Ok(Frame::TooLarge(len)) => {
                debug!("Request exceeds maximum message size: {} bytes", len);
                send_response(
                    &write_tx,
                    0,
                    Response::error(format!(
                        "Request exceeds maximum message size of {} bytes",
                        MAX_MESSAGE_SIZE
                    )),
                )
                .await;
                drop(write_tx);
                let _ = writer_task.await;
                return Err(ServerError::MessageTooLarge);
            }
            Err(e) => return Err(ServerError::Receive(e)),
        };

        let envelope = match decode_envelope(&payload) {
            Ok(env) => env,
            Err(e) => {
                warn!("Failed to parse request envelope: {}", e);
                // We don't know the ID, use 0
                send_response(&write_tx, 0, Response::error("Invalid request format")).await;
                continue;
            }
        };

        let request_id = envelope.id;
        let request = envelope.request;
        debug!("Received request id={}: {:?}", request_id, request);

        let handler = Arc::clone(&handler);
        let shutdown_tx = shutdown_tx.clone();
        let write_tx = write_tx.clone();
        tokio::spawn(async move {
            let response = handler(request, shutdown_tx).await;
            send_response(&write_tx, request_id, response).await;
        });
    }
}

async fn send_response(write_tx: &mpsc::Sender<Vec<u8>>, id: u64, response: Response) {
    match encode_response(&ResponseEnvelope { id, response }) {
        Ok(bytes) => {
            if let Err(e) = write_tx.send(bytes).await {
                debug!("Failed to send response for request {}: {}", id, e);
            }
        }
        Err(e) => error!("Failed to encode response for request {}: {}", id, e),
    }
}

#[cfg(test)]
mod tests;
