use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[source] bincode::Error),

    #[error("message exceeds maximum size")]
    MessageTooLarge,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to supervisor socket: {0}")]
    Connect(#[source] std::io::Error),

    #[error("supervisor closed the connection")]
    Disconnected,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    /// True when nothing is listening on the socket (no file, or a stale
    /// socket file left by a dead supervisor).
    pub fn is_not_listening(&self) -> bool {
        match self {
            ClientError::Connect(e) => matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused
            ),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("stale socket found at {socket_path} cannot be deleted: {source}")]
    StaleSocket {
        socket_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to use symlinked socket path {socket_path}")]
    SocketSymlink { socket_path: PathBuf },

    #[error("cannot bind unix socket at {socket_path}: {source}")]
    Bind {
        socket_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set socket permissions at {socket_path}: {source}")]
    SocketPermissions {
        socket_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to verify peer credentials: {0}")]
    PeerCredentials(#[source] std::io::Error),

    #[error("unauthorized connection: UID {client_uid} does not match supervisor UID {daemon_uid}")]
    Unauthorized { client_uid: u32, daemon_uid: u32 },

    #[error("failed to receive request: {0}")]
    Receive(#[source] std::io::Error),

    #[error("request exceeds maximum message size")]
    MessageTooLarge,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug, Error)]
pub enum AdminRpcError {
    #[error("cannot reach cluster {cluster} at {address}: {source}")]
    Connect {
        cluster: String,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("admin service {command} on cluster {cluster} timed out")]
    Timeout { cluster: String, command: String },

    #[error("I/O error talking to cluster {cluster}: {source}")]
    Io {
        cluster: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed admin document: {0}")]
    Document(#[source] serde_json::Error),

    #[error("admin document exceeds maximum size")]
    DocumentTooLarge,

    #[error("admin service {command} failed: {message}")]
    Service { command: String, message: String },
}
