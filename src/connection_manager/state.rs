use std::fmt;

use serde::Serialize;

/// Life-cycle state of the single realtime connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

impl ConnectionState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        match (self, next) {
            // Explicit disconnect is allowed from anywhere
            (_, Disconnected) => true,
            (Disconnected, Connecting) => true,
            // Missing token is detected before the transport is touched
            (Disconnected, Failed) => true,
            (Connecting, Connected) | (Connecting, Failed) | (Connecting, Reconnecting) => true,
            (Connected, Reconnecting) => true,
            // Drop with a reconnect ceiling of zero
            (Connected, Failed) => true,
            (Reconnecting, Connected) | (Reconnecting, Failed) => true,
            // Explicit connect() while a retry is pending
            (Reconnecting, Connecting) => true,
            (Failed, Connecting) => true,
            _ => false,
        }
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    #[test]
    fn test_documented_transitions() {
        assert!(Disconnected.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Connected));
        assert!(Connecting.can_transition_to(Failed));
        assert!(Connected.can_transition_to(Reconnecting));
        assert!(Reconnecting.can_transition_to(Connected));
        assert!(Reconnecting.can_transition_to(Failed));
        for state in [Disconnected, Connecting, Connected, Reconnecting, Failed] {
            assert!(state.can_transition_to(Disconnected));
        }
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!Disconnected.can_transition_to(Connected));
        assert!(!Disconnected.can_transition_to(Reconnecting));
        assert!(!Connected.can_transition_to(Connecting));
        assert!(!Failed.can_transition_to(Connected));
        assert!(!Failed.can_transition_to(Reconnecting));
    }

    #[test]
    fn test_display() {
        assert_eq!(Reconnecting.to_string(), "reconnecting");
        assert_eq!(serde_json::to_string(&Failed).unwrap(), "\"failed\"");
    }
}
