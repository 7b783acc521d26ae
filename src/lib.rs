// Infrastructure (shared components)
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Wire and transport layer
pub mod events;
pub mod transport;

// Connection components
pub mod connection_manager;
pub mod latency;
pub mod reconnect;
pub mod subscription;

pub use config::ConnectionConfig;
pub use connection_manager::{ConnectionManager, ConnectionState, StaticToken, TokenSupplier};
pub use error::{RealtimeError, Result};
pub use events::{ClientEvent, EventKind, ServerEvent};
pub use subscription::Topic;
