//! Wire messages, typed inbound events and the router that delivers them.

mod message;
mod router;
mod types;

pub use message::{protocol, ClientEvent, EventEnvelope, PongPayload, WireFrame};
pub use router::{DispatchOutcome, EventHandler, EventRouter};
pub use types::{
    AgentLocation, CaseStatusUpdate, CaseUpdate, EventKind, Extra, FormProgress, LocationUpdate,
    NotificationLevel, NotificationPayload, PhotoUpdate, ServerEvent, TypingUpdate, UserActivity,
};
