use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("failed to join multicast group of universe {universe}: {source}")]
    JoinGroup {
        universe: u16,
        source: std::io::Error,
    },
    #[error("failed to configure socket: {0}")]
    Configure(std::io::Error),
    #[error("failed to send to {target}: {source}")]
    Send {
        target: SocketAddr,
        source: std::io::Error,
    },
    #[error("failed to receive: {0}")]
    Receive(std::io::Error),
    #[error("failed to resolve host '{host}': {reason}")]
    Resolve { host: String, reason: String },
    #[error("transport closed")]
    Closed,
}
