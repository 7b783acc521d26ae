use thiserror::Error;

use crate::connection_manager::ConnectionState;
use crate::transport::TransportError;

/// Errors surfaced by the realtime client.
///
/// Only [`RealtimeError::Auth`] and [`RealtimeError::ReconnectExhausted`] are
/// terminal. Everything else is either retried internally or logged.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// No usable bearer token at connect time
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Transport failure while establishing the connection
    #[error("Handshake error: {0}")]
    Handshake(String),

    /// Connection lost after it was established
    #[error("Transport dropped: {0}")]
    TransportDropped(String),

    /// Caller tried to send while the connection was not open
    #[error("Cannot emit '{event}' while {state}")]
    EmitWhileDisconnected {
        event: String,
        state: ConnectionState,
    },

    /// A registered handler returned an error or panicked
    #[error("Handler for '{event}' failed: {message}")]
    Handler { event: String, message: String },

    /// Every reconnect attempt failed
    #[error("Reconnect attempts exhausted after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    /// The attempt was superseded by `disconnect()` or a newer `connect()`
    #[error("Connection attempt cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RealtimeError {
    /// Whether the caller has to act (new credentials, explicit `connect()`)
    /// before the client will try again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::ReconnectExhausted { .. })
    }
}

impl From<TransportError> for RealtimeError {
    fn from(err: TransportError) -> Self {
        Self::Handshake(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RealtimeError>;
