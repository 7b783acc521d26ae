use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::message::EventEnvelope;

/// Fields the server sent that this client does not model yet
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// `case:updated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseUpdate {
    pub case_id: String,
    /// Changed fields, as sent by the server
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `case:status:updated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStatusUpdate {
    pub case_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `case:typing:update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingUpdate {
    pub case_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    pub is_typing: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `location:updated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    pub location_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Severity carried by `notification` and `broadcast`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
    #[serde(other)]
    Other,
}

/// `notification` and `broadcast`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    #[serde(default)]
    pub title: String,
    pub message: String,
    #[serde(rename = "type", default)]
    pub level: NotificationLevel,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `user:activity`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    #[serde(default)]
    pub user_id: Option<String>,
    pub activity: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `mobile:location:update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentLocation {
    #[serde(default)]
    pub case_id: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `mobile:form:progress`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormProgress {
    pub case_id: String,
    #[serde(default)]
    pub form_id: Option<String>,
    /// Completion percentage, 0-100
    pub progress: f64,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `mobile:photo:update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUpdate {
    pub case_id: String,
    #[serde(default)]
    pub photo_count: Option<u32>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Every event category a handler can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Local notification emitted after each successful handshake
    Connected,
    CaseUpdated,
    CaseStatusUpdated,
    CaseTyping,
    LocationUpdated,
    Notification,
    Broadcast,
    UserActivity,
    MobileLocation,
    MobileFormProgress,
    MobilePhoto,
}

impl EventKind {
    pub const ALL: [EventKind; 11] = [
        EventKind::Connected,
        EventKind::CaseUpdated,
        EventKind::CaseStatusUpdated,
        EventKind::CaseTyping,
        EventKind::LocationUpdated,
        EventKind::Notification,
        EventKind::Broadcast,
        EventKind::UserActivity,
        EventKind::MobileLocation,
        EventKind::MobileFormProgress,
        EventKind::MobilePhoto,
    ];

    /// Name on the wire; `connected` never travels over the transport.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::CaseUpdated => "case:updated",
            Self::CaseStatusUpdated => "case:status:updated",
            Self::CaseTyping => "case:typing:update",
            Self::LocationUpdated => "location:updated",
            Self::Notification => "notification",
            Self::Broadcast => "broadcast",
            Self::UserActivity => "user:activity",
            Self::MobileLocation => "mobile:location:update",
            Self::MobileFormProgress => "mobile:form:progress",
            Self::MobilePhoto => "mobile:photo:update",
        }
    }

    /// Inbound application event for a wire name, if known.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "case:updated" => Some(Self::CaseUpdated),
            "case:status:updated" => Some(Self::CaseStatusUpdated),
            "case:typing:update" => Some(Self::CaseTyping),
            "location:updated" => Some(Self::LocationUpdated),
            "notification" => Some(Self::Notification),
            "broadcast" => Some(Self::Broadcast),
            "user:activity" => Some(Self::UserActivity),
            "mobile:location:update" => Some(Self::MobileLocation),
            "mobile:form:progress" => Some(Self::MobileFormProgress),
            "mobile:photo:update" => Some(Self::MobilePhoto),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Decoded inbound event handed to handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Connected,
    CaseUpdated(CaseUpdate),
    CaseStatusUpdated(CaseStatusUpdate),
    CaseTyping(TypingUpdate),
    LocationUpdated(LocationUpdate),
    Notification(NotificationPayload),
    Broadcast(NotificationPayload),
    UserActivity(UserActivity),
    MobileLocation(AgentLocation),
    MobileFormProgress(FormProgress),
    MobilePhoto(PhotoUpdate),
}

impl ServerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connected => EventKind::Connected,
            Self::CaseUpdated(_) => EventKind::CaseUpdated,
            Self::CaseStatusUpdated(_) => EventKind::CaseStatusUpdated,
            Self::CaseTyping(_) => EventKind::CaseTyping,
            Self::LocationUpdated(_) => EventKind::LocationUpdated,
            Self::Notification(_) => EventKind::Notification,
            Self::Broadcast(_) => EventKind::Broadcast,
            Self::UserActivity(_) => EventKind::UserActivity,
            Self::MobileLocation(_) => EventKind::MobileLocation,
            Self::MobileFormProgress(_) => EventKind::MobileFormProgress,
            Self::MobilePhoto(_) => EventKind::MobilePhoto,
        }
    }

    /// Decode an envelope. `Ok(None)` for names this client does not know.
    pub fn decode(envelope: &EventEnvelope) -> Result<Option<Self>, serde_json::Error> {
        let Some(kind) = EventKind::from_wire(&envelope.name) else {
            return Ok(None);
        };
        let payload = &envelope.payload;
        let event = match kind {
            EventKind::Connected => Self::Connected,
            EventKind::CaseUpdated => Self::CaseUpdated(parse(payload)?),
            EventKind::CaseStatusUpdated => Self::CaseStatusUpdated(parse(payload)?),
            EventKind::CaseTyping => Self::CaseTyping(parse(payload)?),
            EventKind::LocationUpdated => Self::LocationUpdated(parse(payload)?),
            EventKind::Notification => Self::Notification(parse(payload)?),
            EventKind::Broadcast => Self::Broadcast(parse(payload)?),
            EventKind::UserActivity => Self::UserActivity(parse(payload)?),
            EventKind::MobileLocation => Self::MobileLocation(parse(payload)?),
            EventKind::MobileFormProgress => Self::MobileFormProgress(parse(payload)?),
            EventKind::MobilePhoto => Self::MobilePhoto(parse(payload)?),
        };
        Ok(Some(event))
    }
}

fn parse<T: DeserializeOwned>(payload: &serde_json::Value) -> Result<T, serde_json::Error> {
    T::deserialize(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WireFrame;
    use serde_json::json;

    fn envelope(name: &str, data: serde_json::Value) -> EventEnvelope {
        WireFrame::new(name, data).into()
    }

    #[test]
    fn test_wire_names_round_trip() {
        for kind in EventKind::ALL.iter().filter(|k| **k != EventKind::Connected) {
            assert_eq!(EventKind::from_wire(kind.wire_name()), Some(*kind));
        }
        assert_eq!(EventKind::from_wire("connected"), None);
    }

    #[test]
    fn test_decode_case_status_update() {
        let event = ServerEvent::decode(&envelope(
            "case:status:updated",
            json!({ "caseId": "C-7", "status": "in_progress", "updatedBy": "u1", "priority": 2 }),
        ))
        .unwrap()
        .unwrap();

        match event {
            ServerEvent::CaseStatusUpdated(update) => {
                assert_eq!(update.case_id, "C-7");
                assert_eq!(update.status, "in_progress");
                assert_eq!(update.updated_by.as_deref(), Some("u1"));
                assert_eq!(update.extra.get("priority"), Some(&json!(2)));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_decode_notification_with_unknown_level() {
        let event = ServerEvent::decode(&envelope(
            "broadcast",
            json!({ "title": "Maintenance", "message": "Down at 2am", "type": "maintenance" }),
        ))
        .unwrap()
        .unwrap();
        assert_eq!(event.kind(), EventKind::Broadcast);
        if let ServerEvent::Broadcast(payload) = event {
            assert_eq!(payload.level, NotificationLevel::Other);
        }
    }

    #[test]
    fn test_decode_unknown_event_is_none() {
        let decoded = ServerEvent::decode(&envelope("case:archived", json!({}))).unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_decode_malformed_payload_errors() {
        let result = ServerEvent::decode(&envelope("mobile:form:progress", json!({ "caseId": 1 })));
        assert!(result.is_err());
    }
}
