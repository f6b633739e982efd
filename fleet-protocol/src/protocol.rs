use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::errors::ProtocolError;

/// Maximum frame size (1MB). Control-plane messages are tiny; anything
/// larger is a broken or hostile peer.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Request sent from fleet tools to a component's supervisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Check that the supervisor is alive
    Ping,
    /// Port to pid mapping of the supervised programs
    Status,
    /// Detailed program listing (names, start times, supervisor pid)
    ListPrograms,
    /// Stop every supervised program, then exit the supervisor
    Stop,
    /// Exit the supervisor without touching its programs
    Shutdown,
}

impl Request {
    /// Return the variant name as a static string (for lightweight error reporting)
    pub fn variant_name(&self) -> &'static str {
        match self {
            Request::Ping => "Ping",
            Request::Status => "Status",
            Request::ListPrograms => "ListPrograms",
            Request::Stop => "Stop",
            Request::Shutdown => "Shutdown",
        }
    }
}

/// Response sent from the supervisor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Ok {
        message: Option<String>,
        data: Option<ResponseData>,
    },
    Error {
        message: String,
    },
}

impl Response {
    pub fn ok() -> Self {
        Response::Ok {
            message: None,
            data: None,
        }
    }

    pub fn ok_with_message(msg: impl Into<String>) -> Self {
        Response::Ok {
            message: Some(msg.into()),
            data: None,
        }
    }

    pub fn ok_with_data(data: ResponseData) -> Self {
        Response::Ok {
            message: None,
            data: Some(data),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Response::Error {
            message: msg.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponseData {
    Status(StatusSnapshot),
    Programs(SupervisorInfo),
}

/// Which supervised program listens on which port, and under which pid.
/// A port mapped to `None` is configured but has no live process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub port_to_pid: BTreeMap<u16, Option<u32>>,
}

impl StatusSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// True if at least one port maps to a live pid.
    pub fn has_running(&self) -> bool {
        self.port_to_pid.values().any(Option::is_some)
    }

    pub fn running_pids(&self) -> impl Iterator<Item = u32> + '_ {
        self.port_to_pid.values().filter_map(|pid| *pid)
    }
}

impl FromIterator<(u16, Option<u32>)> for StatusSnapshot {
    fn from_iter<I: IntoIterator<Item = (u16, Option<u32>)>>(iter: I) -> Self {
        Self {
            port_to_pid: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramInfo {
    pub name: String,
    pub port: u16,
    pub pid: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorInfo {
    pub pid: u32,
    pub component_dir: PathBuf,
    pub uptime_secs: u64,
    pub programs: Vec<ProgramInfo>,
}

/// Client-to-server message with request ID for multiplexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: u64,
    pub request: Request,
}

/// Server-to-client message answering the request with the same ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub id: u64,
    pub response: Response,
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

fn encode_frame<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let size = bincode::serialized_size(value).map_err(ProtocolError::Encode)?;
    if size > MAX_MESSAGE_SIZE as u64 {
        return Err(ProtocolError::MessageTooLarge);
    }
    let len = size as u32;
    let mut frame = Vec::with_capacity(4 + size as usize);
    frame.extend_from_slice(&len.to_be_bytes());
    bincode::serialize_into(&mut frame, value).map_err(ProtocolError::Encode)?;
    Ok(frame)
}

fn decode_frame<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(ProtocolError::Decode)
}

/// Encode a request envelope to length-prefixed bincode bytes
pub fn encode_envelope(envelope: &RequestEnvelope) -> Result<Vec<u8>> {
    encode_frame(envelope)
}

/// Decode a request envelope from raw bincode payload (framing already stripped)
pub fn decode_envelope(bytes: &[u8]) -> Result<RequestEnvelope> {
    decode_frame(bytes)
}

/// Encode a response envelope to length-prefixed bincode bytes
pub fn encode_response(envelope: &ResponseEnvelope) -> Result<Vec<u8>> {
    encode_frame(envelope)
}

/// Decode a response envelope from raw bincode payload (framing already stripped)
pub fn decode_response(bytes: &[u8]) -> Result<ResponseEnvelope> {
    decode_frame(bytes)
}

/// Outcome of reading one length-prefixed frame.
#[derive(Debug)]
pub enum Frame {
    Payload(Vec<u8>),
    /// Peer closed the stream cleanly before a new header.
    Eof,
    /// Header announced more than `max_len` bytes; the payload was not read.
    TooLarge(usize),
}

/// Read a 4-byte big-endian length header followed by the payload.
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> std::io::Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_buf).await {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Ok(Frame::Eof);
        }
        return Err(e);
    }
    let msg_len = u32::from_be_bytes(len_buf) as usize;
    if msg_len > max_len {
        return Ok(Frame::TooLarge(msg_len));
    }

    let mut payload = vec![0u8; msg_len];
    reader.read_exact(&mut payload).await?;
    Ok(Frame::Payload(payload))
}
