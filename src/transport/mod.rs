//! Transport abstraction for the realtime link.
//!
//! A transport opens one bidirectional, event-multiplexed link per call to
//! [`Transport::open`]. Implementations:
//! - `websocket`: WebSocket via tokio-tungstenite
//! - `memory`: in-process, scriptable (tests and local demos)

mod memory;
mod websocket;

pub use memory::{MemoryPeer, MemoryServer, MemoryTransport, OpenBehavior, OpenRecord};
pub use websocket::WebSocketTransport;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::events::WireFrame;

/// Errors raised while opening a link
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Could not reach or upgrade the endpoint
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Server refused the credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Link opened but the peer broke protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No handshake acknowledgement in time
    #[error("Handshake timed out after {0}ms")]
    Timeout(u64),

    /// Link closed before the handshake completed
    #[error("Link closed during handshake")]
    Closed,
}

/// Parameters of one handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    pub endpoint: String,
    pub token: String,
    pub platform: String,
}

/// Why a link ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer sent a close frame
    ServerClosed { code: Option<u16>, reason: String },
    /// I/O or protocol failure
    NetworkError(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerClosed { code: Some(code), reason } => {
                write!(f, "server closed the connection ({}): {}", code, reason)
            }
            Self::ServerClosed { code: None, reason } => {
                write!(f, "server closed the connection: {}", reason)
            }
            Self::NetworkError(e) => write!(f, "network error: {}", e),
        }
    }
}

/// Something the transport observed on an open link
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Frame(WireFrame),
    Closed(CloseReason),
}

/// Both directions of an open link.
///
/// Dropping `outbound` asks the transport to close the link.
pub struct TransportLink {
    pub outbound: mpsc::UnboundedSender<WireFrame>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a link and complete the transport-level handshake.
    ///
    /// The application-level acknowledgement (`connected-ack`) arrives on
    /// `inbound` and is awaited by the caller.
    async fn open(&self, request: &HandshakeRequest) -> Result<TransportLink, TransportError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}
