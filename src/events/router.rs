//! Routes decoded inbound events to the one handler registered per kind.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::RealtimeError;
use crate::metrics::EventMetrics;

use super::message::EventEnvelope;
use super::types::{EventKind, ServerEvent};

/// Callback invoked for a single event kind.
pub type EventHandler = Arc<dyn Fn(&ServerEvent) -> anyhow::Result<()> + Send + Sync>;

/// What happened to one inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    /// Known kind without a handler, or a name this client does not know
    Unhandled,
    /// Payload did not match the expected shape
    DecodeFailed(String),
    /// Handler returned an error or panicked
    HandlerFailed(String),
}

/// Maps event kinds to handlers; last registration wins.
#[derive(Default)]
pub struct EventRouter {
    handlers: DashMap<EventKind, EventHandler>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Register `handler` for `kind`, replacing any previous one.
    pub fn register_handler<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&ServerEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        if self.handlers.insert(kind, Arc::new(handler)).is_some() {
            tracing::debug!(event = %kind, "Replaced existing event handler");
        } else {
            tracing::debug!(event = %kind, "Registered event handler");
        }
    }

    /// Remove the handler for `kind`. Returns whether one was registered.
    pub fn unregister_handler(&self, kind: EventKind) -> bool {
        self.handlers.remove(&kind).is_some()
    }

    pub fn has_handler(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Decode an envelope and dispatch it.
    pub fn route(&self, envelope: &EventEnvelope) -> DispatchOutcome {
        match ServerEvent::decode(envelope) {
            Ok(Some(event)) => self.dispatch(&event),
            Ok(None) => {
                tracing::debug!(event = %envelope.name, "Dropping unknown event");
                EventMetrics::record_unhandled();
                DispatchOutcome::Unhandled
            }
            Err(e) => {
                let error = RealtimeError::from(e);
                tracing::warn!(
                    event = %envelope.name,
                    error = %error,
                    "Failed to decode event payload"
                );
                DispatchOutcome::DecodeFailed(error.to_string())
            }
        }
    }

    /// Invoke the handler for `event` once.
    ///
    /// Handler errors and panics stop here: they are logged with the event
    /// name and never reach the caller or other handlers.
    pub fn dispatch(&self, event: &ServerEvent) -> DispatchOutcome {
        let kind = event.kind();

        // Clone out so the map shard is not locked while user code runs;
        // handlers may register or unregister handlers themselves.
        let handler = match self.handlers.get(&kind) {
            Some(entry) => entry.value().clone(),
            None => {
                EventMetrics::record_unhandled();
                return DispatchOutcome::Unhandled;
            }
        };

        let message = match catch_unwind(AssertUnwindSafe(|| handler(event))) {
            Ok(Ok(())) => {
                EventMetrics::record_dispatched(kind.wire_name());
                return DispatchOutcome::Delivered;
            }
            Ok(Err(e)) => format!("{:#}", e),
            Err(panic) => format!("handler panicked: {}", panic_message(panic.as_ref())),
        };

        let error = RealtimeError::Handler {
            event: kind.wire_name().to_string(),
            message,
        };
        EventMetrics::record_handler_failure(kind.wire_name());
        tracing::error!(event = %kind, error = %error, "Event handler failed");
        DispatchOutcome::HandlerFailed(error.to_string())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::NotificationPayload;
    use crate::events::WireFrame;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn notification(message: &str) -> ServerEvent {
        ServerEvent::Notification(NotificationPayload {
            title: "t".to_string(),
            message: message.to_string(),
            level: Default::default(),
            extra: Default::default(),
        })
    }

    #[test]
    fn test_unregistered_event_is_noop() {
        let router = EventRouter::new();
        let envelope: EventEnvelope = WireFrame::new(
            "case:status:updated",
            json!({ "caseId": "A", "status": "open" }),
        )
        .into();
        assert_eq!(router.route(&envelope), DispatchOutcome::Unhandled);
    }

    #[test]
    fn test_last_registration_wins() {
        let router = EventRouter::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let f = first.clone();
        router.register_handler(EventKind::Notification, move |_| {
            f.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let s = second.clone();
        router.register_handler(EventKind::Notification, move |_| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(router.dispatch(&notification("hi")), DispatchOutcome::Delivered);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_error_is_contained() {
        let router = EventRouter::new();
        let delivered = Arc::new(AtomicUsize::new(0));

        router.register_handler(EventKind::Notification, |_| anyhow::bail!("boom"));
        let d = delivered.clone();
        router.register_handler(EventKind::Broadcast, move |_| {
            d.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let outcome = router.dispatch(&notification("x"));
        assert_eq!(
            outcome,
            DispatchOutcome::HandlerFailed("Handler for 'notification' failed: boom".to_string())
        );

        let broadcast = ServerEvent::Broadcast(NotificationPayload {
            title: String::new(),
            message: "all".to_string(),
            level: Default::default(),
            extra: Default::default(),
        });
        assert_eq!(router.dispatch(&broadcast), DispatchOutcome::Delivered);
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_panic_is_contained() {
        let router = EventRouter::new();
        router.register_handler(EventKind::Notification, |_| panic!("handler exploded"));

        let outcome = router.dispatch(&notification("x"));
        assert!(matches!(outcome, DispatchOutcome::HandlerFailed(ref m) if m.contains("handler exploded")));

        // Router still usable afterwards
        assert!(router.has_handler(EventKind::Notification));
        assert!(router.unregister_handler(EventKind::Notification));
        assert_eq!(router.dispatch(&notification("y")), DispatchOutcome::Unhandled);
    }

    #[test]
    fn test_decode_failure_reported() {
        let router = EventRouter::new();
        router.register_handler(EventKind::LocationUpdated, |_| Ok(()));
        let envelope: EventEnvelope =
            WireFrame::new("location:updated", json!({ "locationId": "L1" })).into();
        assert!(matches!(
            router.route(&envelope),
            DispatchOutcome::DecodeFailed(ref m) if m.starts_with("Serialization error:")
        ));
    }
}
