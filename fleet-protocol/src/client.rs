use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::{
    io::AsyncWriteExt,
    net::UnixStream,
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::debug;

use crate::{
    errors::ClientError,
    protocol::{
        Frame, MAX_MESSAGE_SIZE, Request, RequestEnvelope, Response, decode_response,
        encode_envelope, read_frame,
    },
};

pub type Result<T> = std::result::Result<T, ClientError>;

/// Bounded channel capacity for the client writer task.
const WRITER_CHANNEL_CAPACITY: usize = 16;

/// Connection to a component supervisor.
///
/// Requests are multiplexed by ID over one socket, so several may be in
/// flight on a shared `&Client`.
pub struct Client {
    writer_tx: mpsc::Sender<Vec<u8>>,
    pending: Arc<DashMap<u64, oneshot::Sender<Response>>>,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
    _reader_handle: JoinHandle<()>,
    _writer_handle: JoinHandle<()>,
}

impl Client {
    /// Connect to the supervisor at the given socket path
    pub async fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path)
            .await
            .map_err(ClientError::Connect)?;

        let (read_half, mut write_half) = stream.into_split();

        let pending: Arc<DashMap<u64, oneshot::Sender<Response>>> = Arc::new(DashMap::new());

        // Writer task: receives encoded bytes and writes to stream
        let (writer_tx, mut writer_rx) = mpsc::channel::<Vec<u8>>(WRITER_CHANNEL_CAPACITY);
        let writer_handle = tokio::spawn(async move {
            while let Some(bytes) = writer_rx.recv().await {
                if let Err(e) = write_half.write_all(&bytes).await {
                    debug!("Client writer error: {}", e);
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        });

        // Reader task: reads frames and completes the matching pending request
        let reader_pending = pending.clone();
        let reader_closed = Arc::new(AtomicBool::new(false));
        let closed = reader_closed.clone();
        let reader_handle = tokio::spawn(async move {
            let mut reader = read_half;
            loop {
                let payload = match read_frame(&mut reader, MAX_MESSAGE_SIZE).await {
                    Ok(Frame::Payload(payload)) => payload,
                    Ok(Frame::Eof) => {
                        debug!("Supervisor disconnected (EOF)");
                        break;
                    }
                    Ok(Frame::TooLarge(len)) => {
                        debug!("Supervisor message of {} bytes exceeds maximum size", len);
                        break;
                    }
                    Err(e) => {
                        debug!("Client reader error: {}", e);
                        break;
                    }
                };

                match decode_response(&payload) {
                    Ok(envelope) => {
                        if let Some((_, response_tx)) = reader_pending.remove(&envelope.id) {
                            let _ = response_tx.send(envelope.response);
                        } else {
                            debug!("Received response for unknown request id={}", envelope.id);
                        }
                    }
                    Err(e) => debug!("Failed to decode supervisor message: {}", e),
                }
            }
            // Drop all pending senders so waiters get RecvError -> Disconnected
            reader_closed.store(true, Ordering::SeqCst);
            reader_pending.clear();
        });

        Ok(Self {
            writer_tx,
            pending,
            closed,
            next_id: AtomicU64::new(1),
            _reader_handle: reader_handle,
            _writer_handle: writer_handle,
        })
    }

    /// Check if a supervisor answers on the socket
    pub async fn is_supervisor_running(socket_path: &Path) -> bool {
        if !socket_path.exists() {
            return false;
        }

        match Self::connect(socket_path).await {
            Ok(client) => matches!(client.ping().await, Ok(Response::Ok { .. })),
            Err(_) => false,
        }
    }

    /// Send a request and wait for its response.
    pub async fn send_request(&self, request: Request) -> Result<Response> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (response_tx, response_rx) = oneshot::channel();

        let envelope = RequestEnvelope { id, request };
        let bytes = encode_envelope(&envelope)?;

        debug!("Sending request id={} ({})", id, envelope.request.variant_name());
        self.pending.insert(id, response_tx);
        // The reader may have exited before the insert; nobody would complete it
        if self.closed.load(Ordering::SeqCst) || self.writer_tx.send(bytes).await.is_err() {
            self.pending.remove(&id);
            return Err(ClientError::Disconnected);
        }

        response_rx.await.map_err(|_| ClientError::Disconnected)
    }

    pub async fn ping(&self) -> Result<Response> {
        self.send_request(Request::Ping).await
    }

    /// Port to pid mapping of the supervised programs
    pub async fn status(&self) -> Result<Response> {
        self.send_request(Request::Status).await
    }

    pub async fn list_programs(&self) -> Result<Response> {
        self.send_request(Request::ListPrograms).await
    }

    /// Stop the supervised programs and the supervisor itself
    pub async fn stop(&self) -> Result<Response> {
        self.send_request(Request::Stop).await
    }

    pub async fn shutdown(&self) -> Result<Response> {
        self.send_request(Request::Shutdown).await
    }
}

#[cfg(test)]
mod tests;
