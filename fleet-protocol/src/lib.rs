//! Control plane between fleet tools and component supervisors.
//!
//! - `protocol` - request/response types and length-prefixed bincode framing
//! - `client` - multiplexing client over the supervisor's Unix socket
//! - `server` - Unix socket server driving a request handler
//! - `admin` - JSON document exchange with cluster admin services

#[cfg(not(unix))]
compile_error!("fleet-protocol requires a unix target (Unix sockets, peer credentials)");

pub mod admin;
pub mod client;
pub mod errors;
pub mod protocol;
pub mod server;
