//! Admin service invocation.
//!
//! The admin UI drives a cluster by sending it a command name plus a
//! structured document and reading back a document. The document schema
//! belongs to each admin service, so it travels as plain JSON; framing is
//! the same 4-byte big-endian length prefix as the control-plane protocol.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};
use tracing::debug;

use crate::errors::AdminRpcError;
use crate::protocol::{Frame, MAX_MESSAGE_SIZE, read_frame};

pub type Result<T> = std::result::Result<T, AdminRpcError>;

/// Default time allowed for connect + request + response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A cluster as known to the admin UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRef {
    pub id: u64,
    pub name: String,
    /// `host:port` of the cluster's admin endpoint
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminRequest {
    pub cluster_id: u64,
    /// Service name, e.g. `security.ssl.get-list`
    pub command: String,
    pub document: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminResponse {
    pub status: AdminStatus,
    #[serde(default)]
    pub document: Value,
    /// Error details when `status` is `error`
    #[serde(default)]
    pub details: Option<String>,
}

impl AdminResponse {
    pub fn ok(document: Value) -> Self {
        Self {
            status: AdminStatus::Ok,
            document,
            details: None,
        }
    }

    pub fn error(details: impl Into<String>) -> Self {
        Self {
            status: AdminStatus::Error,
            document: Value::Null,
            details: Some(details.into()),
        }
    }
}

/// Encode a JSON value as a length-prefixed frame.
pub fn encode_json_frame<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(value).map_err(AdminRpcError::Document)?;
    if body.len() > MAX_MESSAGE_SIZE {
        return Err(AdminRpcError::DocumentTooLarge);
    }
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Client for cluster admin services.
#[derive(Debug, Clone)]
pub struct AdminRpcClient {
    timeout: Duration,
}

impl Default for AdminRpcClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl AdminRpcClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Invoke `command` on `cluster` with `document` and return the
    /// service's response document. An `error` status from the service
    /// becomes `AdminRpcError::Service`.
    pub async fn invoke(
        &self,
        cluster: &ClusterRef,
        command: &str,
        document: Value,
    ) -> Result<AdminResponse> {
        let request = AdminRequest {
            cluster_id: cluster.id,
            command: command.to_string(),
            document,
        };

        let call = async {
            let mut stream = TcpStream::connect(&cluster.address)
                .await
                .map_err(|source| AdminRpcError::Connect {
                    cluster: cluster.name.clone(),
                    address: cluster.address.clone(),
                    source,
                })?;
            exchange(&mut stream, &cluster.name, &request).await
        };

        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| AdminRpcError::Timeout {
                cluster: cluster.name.clone(),
                command: command.to_string(),
            })??;

        match response.status {
            AdminStatus::Ok => Ok(response),
            AdminStatus::Error => Err(AdminRpcError::Service {
                command: command.to_string(),
                message: response
                    .details
                    .unwrap_or_else(|| "no details given".to_string()),
            }),
        }
    }
}

async fn exchange<S>(stream: &mut S, cluster: &str, request: &AdminRequest) -> Result<AdminResponse>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let io_error = |source: std::io::Error| AdminRpcError::Io {
        cluster: cluster.to_string(),
        source,
    };

    debug!("Invoking {} on cluster {}", request.command, cluster);
    let frame = encode_json_frame(request)?;
    stream.write_all(&frame).await.map_err(io_error)?;
    stream.flush().await.map_err(io_error)?;

    match read_frame(stream, MAX_MESSAGE_SIZE).await.map_err(io_error)? {
        Frame::Payload(payload) => {
            serde_json::from_slice(&payload).map_err(AdminRpcError::Document)
        }
        Frame::Eof => Err(io_error(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed before a response",
        ))),
        Frame::TooLarge(_) => Err(AdminRpcError::DocumentTooLarge),
    }
}

#[cfg(test)]
mod tests;
