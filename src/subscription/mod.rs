//! Topics the caller wants live updates for.
//!
//! The registry is a set: adding an existing topic or removing a missing one
//! changes nothing. It survives reconnects; the connection manager replays it
//! every time the link reaches `Connected`.

use std::fmt;
use std::str::FromStr;

use crate::events::ClientEvent;

/// A named scope for live updates, rendered as `case:<id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    Case(String),
}

impl Topic {
    pub fn case(id: impl Into<String>) -> Self {
        Self::Case(id.into())
    }

    pub fn subscribe_signal(&self) -> ClientEvent {
        match self {
            Self::Case(id) => ClientEvent::SubscribeCase {
                case_id: id.clone(),
            },
        }
    }

    pub fn unsubscribe_signal(&self) -> ClientEvent {
        match self {
            Self::Case(id) => ClientEvent::UnsubscribeCase {
                case_id: id.clone(),
            },
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Case(id) => write!(f, "case:{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid topic '{0}', expected 'case:<id>'")]
pub struct ParseTopicError(String);

impl FromStr for Topic {
    type Err = ParseTopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("case", id)) if !id.is_empty() => Ok(Self::case(id)),
            _ => Err(ParseTopicError(s.to_string())),
        }
    }
}

/// One entry of the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub topic: Topic,
    pub active: bool,
}

/// Ordered set of active topics plus the replay flag.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: Vec<Subscription>,
    replayed: bool,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `topic`. Returns `false` if it was already active.
    pub fn add(&mut self, topic: Topic) -> bool {
        if self.contains(&topic) {
            return false;
        }
        self.subscriptions.push(Subscription {
            topic,
            active: true,
        });
        true
    }

    /// Remove `topic`. Returns `false` if it was not active.
    pub fn remove(&mut self, topic: &Topic) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| &s.topic != topic);
        self.subscriptions.len() != before
    }

    pub fn contains(&self, topic: &Topic) -> bool {
        self.subscriptions.iter().any(|s| &s.topic == topic)
    }

    pub fn topics(&self) -> Vec<Topic> {
        self.subscriptions.iter().map(|s| s.topic.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Subscribe signals for every active topic, once per connection.
    ///
    /// Returns an empty list if the registry was already replayed on the
    /// current connection.
    pub fn take_replay(&mut self) -> Vec<ClientEvent> {
        if self.replayed {
            return Vec::new();
        }
        self.replayed = true;
        self.subscriptions
            .iter()
            .map(|s| s.topic.subscribe_signal())
            .collect()
    }

    /// Mark as "not yet replayed"; called whenever the connection goes away.
    pub fn reset_replay(&mut self) {
        self.replayed = false;
    }
}
