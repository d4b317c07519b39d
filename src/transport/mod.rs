// graphql-ws subscription transport

mod backoff;
mod client;
mod connector;
mod memory;
pub mod protocol;


pub use backoff::Backoff;
pub use client::{ClientOptions, Subscription, SubscriptionClient};
pub use connector::{Connector, SocketConnection, TungsteniteConnector};
pub use memory::{memory_pair, MemoryConnector, MemoryServer, MemorySocket};
pub use protocol::{ClientMessage, OperationPayload, ServerMessage, GRAPHQL_WS_PROTOCOL};

use std::fmt;

/// Socket-level failures. Recovered by the reconnect policy, never fatal to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Socket could not be opened
    Connect(String),
    /// Read or write on an open socket failed
    Socket(String),
    /// Connect or handshake exceeded the configured timeout
    Timeout,
    /// Server answered `connection_init` with `connection_error`
    Rejected(String),
    /// Socket closed while operations were still waiting on it
    ConnectionClosed,
    /// Message could not be encoded or decoded
    Protocol(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connect(reason) => write!(f, "failed to connect: {}", reason),
            TransportError::Socket(reason) => write!(f, "socket error: {}", reason),
            TransportError::Timeout => write!(f, "connection timed out"),
            TransportError::Rejected(payload) => {
                write!(f, "connection rejected by server: {}", payload)
            }
            TransportError::ConnectionClosed => write!(f, "connection closed"),
            TransportError::Protocol(reason) => write!(f, "protocol error: {}", reason),
        }
    }
}

impl std::error::Error for TransportError {}
