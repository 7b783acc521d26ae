use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Wire names used by the protocol itself rather than by application events.
pub mod protocol {
    pub const CONNECTED_ACK: &str = "connected-ack";
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
}

/// One frame on the wire: `{"event": "<name>", "data": <payload>}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFrame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl WireFrame {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn connected_ack() -> Self {
        Self::new(protocol::CONNECTED_ACK, serde_json::Value::Null)
    }

    pub fn is(&self, name: &str) -> bool {
        self.event == name
    }
}

/// An inbound frame stamped with its arrival time.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub name: String,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl From<WireFrame> for EventEnvelope {
    fn from(frame: WireFrame) -> Self {
        Self {
            name: frame.event,
            payload: frame.data,
            received_at: Utc::now(),
        }
    }
}

/// Messages sent from the dashboard to the server
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    SubscribeCase { case_id: String },
    UnsubscribeCase { case_id: String },
    CaseStatus { case_id: String, status: String },
    CaseTyping { case_id: String, is_typing: bool },
    LocationUpdate {
        case_id: String,
        latitude: f64,
        longitude: f64,
    },
    Ping { timestamp: i64 },
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SubscribeCase { .. } => "subscribe:case",
            Self::UnsubscribeCase { .. } => "unsubscribe:case",
            Self::CaseStatus { .. } => "case:status",
            Self::CaseTyping { .. } => "case:typing",
            Self::LocationUpdate { .. } => "location:update",
            Self::Ping { .. } => protocol::PING,
        }
    }

    pub fn into_frame(self) -> WireFrame {
        let name = self.name();
        let data = match self {
            Self::SubscribeCase { case_id } | Self::UnsubscribeCase { case_id } => json!(case_id),
            Self::CaseStatus { case_id, status } => json!({ "caseId": case_id, "status": status }),
            Self::CaseTyping { case_id, is_typing } => {
                json!({ "caseId": case_id, "isTyping": is_typing })
            }
            Self::LocationUpdate {
                case_id,
                latitude,
                longitude,
            } => json!({ "caseId": case_id, "latitude": latitude, "longitude": longitude }),
            Self::Ping { timestamp } => json!({ "timestamp": timestamp }),
        };
        WireFrame::new(name, data)
    }
}

/// Pong payload; servers echo either the ping object or the bare timestamp.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum PongPayload {
    Object { timestamp: i64 },
    Bare(i64),
}

impl PongPayload {
    pub fn timestamp(&self) -> i64 {
        match *self {
            Self::Object { timestamp } | Self::Bare(timestamp) => timestamp,
        }
    }
}
