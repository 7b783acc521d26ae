//! Owner of the single realtime connection.
//!
//! `ConnectionManager` performs the handshake, wires the latency monitor,
//! subscription registry, reconnect scheduler and event router together, and
//! exposes the public life-cycle API. It is a cheap, cloneable handle.
//!
//! Every link, timer and reader task is tagged with a generation number.
//! `disconnect()` and each newly installed link bump it, so callbacks that
//! belong to an older generation do nothing.

mod state;
mod types;

pub use state::ConnectionState;
pub use types::{StaticToken, TokenSupplier};

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::{mpsc, watch, Notify};

use crate::config::ConnectionConfig;
use crate::error::{RealtimeError, Result};
use crate::events::{
    protocol, ClientEvent, EventEnvelope, EventKind, EventRouter, PongPayload, ServerEvent,
    WireFrame,
};
use crate::latency::{LatencyMonitor, LatencySample};
use crate::metrics::{ConnectionMetrics, EventMetrics};
use crate::reconnect::{BackoffConfig, ExponentialBackoff, ReconnectScheduler, ScheduleDecision};
use crate::subscription::{SubscriptionRegistry, Topic};
use crate::transport::{
    CloseReason, HandshakeRequest, Transport, TransportError, TransportEvent, TransportLink,
    WebSocketTransport,
};

use types::ActiveLink;

/// Who started a connect attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptKind {
    Explicit,
    Reconnect,
}

/// Mutable state guarded by one mutex; never held across `.await`.
struct Core {
    state: ConnectionState,
    generation: u64,
    link: Option<ActiveLink>,
    subscriptions: SubscriptionRegistry,
    reconnect: ReconnectScheduler,
    last_error: Option<String>,
    /// State changed since it was last published to watchers
    state_dirty: bool,
}

/// Lock on [`Core`] that publishes state changes once it is released.
///
/// Watchers run their predicates under the watch channel's lock and may call
/// back into the client, so the watch is never written while `Core` is held.
struct CoreGuard<'a> {
    inner: &'a Inner,
    guard: Option<MutexGuard<'a, Core>>,
}

impl Deref for CoreGuard<'_> {
    type Target = Core;

    fn deref(&self) -> &Core {
        self.guard.as_deref().expect("core guard held until drop")
    }
}

impl DerefMut for CoreGuard<'_> {
    fn deref_mut(&mut self) -> &mut Core {
        self.guard.as_deref_mut().expect("core guard held until drop")
    }
}

impl Drop for CoreGuard<'_> {
    fn drop(&mut self) {
        let dirty = self
            .guard
            .as_mut()
            .is_some_and(|core| std::mem::take(&mut core.state_dirty));
        self.guard = None;
        if dirty {
            self.inner.publish_state();
        }
    }
}

struct Inner {
    config: ConnectionConfig,
    transport: Arc<dyn Transport>,
    tokens: Box<dyn TokenSupplier>,
    router: EventRouter,
    latency: LatencyMonitor,
    core: Mutex<Core>,
    state_tx: watch::Sender<ConnectionState>,
    /// Orders publications so watchers always end on the latest state
    publish_gate: Mutex<()>,
    /// Serializes connect attempts
    connect_gate: tokio::sync::Mutex<()>,
    /// Wakes in-flight handshakes on `disconnect()`
    cancel: Notify,
}

/// Realtime client handle
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    /// Build a client over `transport`. Nothing is opened until `connect()`.
    pub fn new<T>(config: ConnectionConfig, tokens: T, transport: Arc<dyn Transport>) -> Result<Self>
    where
        T: TokenSupplier + 'static,
    {
        config.validate()?;

        let backoff = ExponentialBackoff::with_config(BackoffConfig::from(&config));
        let reconnect = ReconnectScheduler::new(backoff, config.max_reconnect_attempts);
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let latency = LatencyMonitor::new(config.endpoint.clone());

        tracing::debug!(
            endpoint = %config.endpoint,
            transport = transport.name(),
            max_reconnect_attempts = config.max_reconnect_attempts,
            reconnect_base_delay_ms = config.reconnect_base_delay_ms,
            "Realtime client created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                transport,
                tokens: Box::new(tokens),
                router: EventRouter::new(),
                latency,
                core: Mutex::new(Core {
                    state: ConnectionState::Disconnected,
                    generation: 0,
                    link: None,
                    subscriptions: SubscriptionRegistry::new(),
                    reconnect,
                    last_error: None,
                    state_dirty: false,
                }),
                state_tx,
                publish_gate: Mutex::new(()),
                connect_gate: tokio::sync::Mutex::new(()),
                cancel: Notify::new(),
            }),
        })
    }

    /// Build a client that talks WebSocket to `config.endpoint`.
    pub fn websocket<T>(config: ConnectionConfig, tokens: T) -> Result<Self>
    where
        T: TokenSupplier + 'static,
    {
        Self::new(config, tokens, Arc::new(WebSocketTransport::new()))
    }

    /// Open the connection.
    ///
    /// Succeeds immediately if already connected. A missing token fails with
    /// [`RealtimeError::Auth`] and leaves the client `Failed` with no retry.
    /// A handshake failure returns [`RealtimeError::Handshake`] while the
    /// reconnect path keeps trying in the background.
    pub async fn connect(&self) -> Result<()> {
        let _gate = self.inner.connect_gate.lock().await;

        let generation = {
            let mut core = self.inner.lock_core();
            if core.state.is_connected() {
                return Ok(());
            }
            // An explicit connect starts a fresh sequence
            core.reconnect.reset();
            core.generation += 1;
            core.generation
        };

        self.inner.attempt(generation, AttemptKind::Explicit).await
    }

    /// Tear everything down. Idempotent and safe from any state.
    ///
    /// Pending reconnect and ping timers are invalidated before this returns;
    /// frames that arrive later are ignored.
    pub fn disconnect(&self) {
        let mut core = self.inner.lock_core();
        core.generation += 1;
        core.reconnect.reset();
        let had_link = core.link.take().is_some();
        core.subscriptions.reset_replay();
        self.inner.cancel.notify_waiters();

        if core.state != ConnectionState::Disconnected {
            tracing::info!(had_link = had_link, "Disconnecting");
            self.inner.set_state(&mut core, ConnectionState::Disconnected);
        }
    }

    /// Add `topic` to the live set. Sent now when connected, otherwise on
    /// the next transition into `Connected`. Returns `false` if already
    /// subscribed.
    pub fn subscribe(&self, topic: Topic) -> bool {
        let mut core = self.inner.lock_core();
        if !core.subscriptions.add(topic.clone()) {
            tracing::debug!(topic = %topic, "Already subscribed");
            return false;
        }

        if core.state.is_connected() {
            if let Some(link) = &core.link {
                link.send(topic.subscribe_signal().into_frame());
            }
            tracing::debug!(topic = %topic, "Subscribed");
        } else {
            tracing::debug!(topic = %topic, state = %core.state, "Subscription queued until connected");
        }
        true
    }

    /// Remove `topic`. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, topic: &Topic) -> bool {
        let mut core = self.inner.lock_core();
        if !core.subscriptions.remove(topic) {
            return false;
        }

        if core.state.is_connected() {
            if let Some(link) = &core.link {
                link.send(topic.unsubscribe_signal().into_frame());
            }
        }
        tracing::debug!(topic = %topic, "Unsubscribed");
        true
    }

    /// Send an event. Dropped with a warning unless connected; there is no
    /// outbound queue.
    pub fn emit(&self, event: ClientEvent) -> Result<()> {
        let core = self.inner.lock_core();
        let name = event.name();

        let link = match (&core.link, core.state) {
            (Some(link), ConnectionState::Connected) => link,
            (_, state) => {
                EventMetrics::record_emit_dropped();
                tracing::warn!(event = name, state = %state, "Dropping event emitted while not connected");
                return Err(RealtimeError::EmitWhileDisconnected {
                    event: name.to_string(),
                    state,
                });
            }
        };

        if !link.send(event.into_frame()) {
            EventMetrics::record_emit_dropped();
            tracing::warn!(event = name, link_id = %link.id, "Dropping event, link already closed");
            return Err(RealtimeError::TransportDropped("link closed".to_string()));
        }
        Ok(())
    }

    pub fn update_case_status(&self, case_id: impl Into<String>, status: impl Into<String>) -> Result<()> {
        self.emit(ClientEvent::CaseStatus {
            case_id: case_id.into(),
            status: status.into(),
        })
    }

    pub fn set_typing(&self, case_id: impl Into<String>, is_typing: bool) -> Result<()> {
        self.emit(ClientEvent::CaseTyping {
            case_id: case_id.into(),
            is_typing,
        })
    }

    pub fn update_location(&self, case_id: impl Into<String>, latitude: f64, longitude: f64) -> Result<()> {
        self.emit(ClientEvent::LocationUpdate {
            case_id: case_id.into(),
            latitude,
            longitude,
        })
    }

    /// Register the handler for `kind`, replacing any previous one.
    pub fn register_handler<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&ServerEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.router.register_handler(kind, handler);
    }

    pub fn unregister_handler(&self, kind: EventKind) -> bool {
        self.inner.router.unregister_handler(kind)
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock_core().state
    }

    /// Receiver that observes every state transition
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.lock_core().last_error.clone()
    }

    pub fn latency(&self) -> Option<LatencySample> {
        self.inner.latency.latest()
    }

    pub fn is_subscribed(&self, topic: &Topic) -> bool {
        self.inner.lock_core().subscriptions.contains(topic)
    }

    pub fn subscriptions(&self) -> Vec<Topic> {
        self.inner.lock_core().subscriptions.topics()
    }

    /// Reconnect attempts made since the last successful connection
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.lock_core().reconnect.attempts()
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.inner.lock_core().reconnect.has_pending()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }
}

impl Inner {
    fn lock_core(&self) -> CoreGuard<'_> {
        CoreGuard {
            inner: self,
            guard: Some(self.core.lock().unwrap_or_else(PoisonError::into_inner)),
        }
    }

    /// Push the current state to watchers. Must not be called with `Core` locked.
    fn publish_state(&self) {
        let _publish = self.publish_gate.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self.core.lock().unwrap_or_else(PoisonError::into_inner).state;
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    fn set_state(&self, core: &mut Core, next: ConnectionState) {
        let previous = core.state;
        if previous == next {
            return;
        }
        if !previous.can_transition_to(next) {
            tracing::error!(from = %previous, to = %next, "Refusing illegal state transition");
            return;
        }

        core.state = next;
        core.state_dirty = true;
        ConnectionMetrics::set_state(&self.config.endpoint, next);
        tracing::info!(from = %previous, to = %next, "Connection state changed");
    }

    /// One handshake attempt for `generation`.
    async fn attempt(self: &Arc<Self>, generation: u64, kind: AttemptKind) -> Result<()> {
        let Some(token) = self.tokens.token().filter(|t| !t.trim().is_empty()) else {
            return Err(self.fail_auth(generation, "no auth token available".to_string()));
        };

        {
            let mut core = self.lock_core();
            if core.generation != generation {
                return Err(RealtimeError::Cancelled);
            }
            if kind == AttemptKind::Explicit {
                self.set_state(&mut core, ConnectionState::Connecting);
            }
        }

        let request = HandshakeRequest {
            endpoint: self.config.endpoint.clone(),
            token,
            platform: self.config.platform.clone(),
        };

        // Register interest before re-checking so a disconnect in between is not missed
        let cancelled = self.cancel.notified();
        tokio::pin!(cancelled);
        cancelled.as_mut().enable();
        if self.lock_core().generation != generation {
            return Err(RealtimeError::Cancelled);
        }

        tracing::debug!(
            endpoint = %request.endpoint,
            attempt_kind = ?kind,
            "Opening realtime connection"
        );

        let outcome = tokio::select! {
            _ = &mut cancelled => return Err(RealtimeError::Cancelled),
            outcome = self.handshake(&request) => outcome,
        };

        match outcome {
            Ok(link) => self.install_link(generation, link),
            Err(err) => Err(self.handshake_failed(generation, err)),
        }
    }

    /// Open the transport and wait for `connected-ack`.
    async fn handshake(&self, request: &HandshakeRequest) -> std::result::Result<TransportLink, TransportError> {
        let timeout_ms = self.config.handshake_timeout_ms;

        let open_and_ack = async {
            let mut link = self.transport.open(request).await?;
            loop {
                match link.inbound.recv().await {
                    Some(TransportEvent::Frame(frame)) if frame.is(protocol::CONNECTED_ACK) => {
                        return Ok(link);
                    }
                    Some(TransportEvent::Frame(frame)) => {
                        tracing::debug!(event = %frame.event, "Ignoring frame received before acknowledgement");
                    }
                    Some(TransportEvent::Closed(reason)) => {
                        return Err(TransportError::Protocol(reason.to_string()));
                    }
                    None => return Err(TransportError::Closed),
                }
            }
        };

        tokio::time::timeout(self.config.handshake_timeout(), open_and_ack)
            .await
            .map_err(|_| TransportError::Timeout(timeout_ms))?
    }

    /// Promote an acknowledged link to the active one.
    fn install_link(self: &Arc<Self>, generation: u64, link: TransportLink) -> Result<()> {
        let TransportLink { outbound, inbound } = link;

        let (link_generation, link_id) = {
            let mut core = self.lock_core();
            if core.generation != generation {
                return Err(RealtimeError::Cancelled);
            }

            core.generation += 1;
            core.reconnect.reset();
            core.last_error = None;

            let pinger = self.latency.start(self.config.ping_interval(), outbound.clone());
            let active = ActiveLink::new(outbound, pinger);
            let link_id = active.id;

            // Replay under the same lock that flips the state so a concurrent
            // subscribe() cannot send the same topic twice.
            core.subscriptions.reset_replay();
            let replay = core.subscriptions.take_replay();
            let replayed = replay.len();
            for signal in replay {
                active.send(signal.into_frame());
            }

            core.link = Some(active);
            self.set_state(&mut core, ConnectionState::Connected);

            tracing::info!(
                link_id = %link_id,
                endpoint = %self.config.endpoint,
                replayed_topics = replayed,
                "Realtime connection established"
            );
            (core.generation, link_id)
        };

        ConnectionMetrics::record_attempt("success");
        self.router.dispatch(&ServerEvent::Connected);

        // Started after the connected notification so it is the first event
        // handlers see; frames wait in the channel meanwhile.
        let mut core = self.lock_core();
        if core.generation != link_generation {
            tracing::debug!(link_id = %link_id, "Link superseded before reader start");
            return Ok(());
        }
        if let Some(active) = core.link.as_mut() {
            let weak = Arc::downgrade(self);
            active.reader = Some(tokio::spawn(read_loop(weak, link_generation, inbound)));
        }
        Ok(())
    }

    fn fail_auth(&self, generation: u64, message: String) -> RealtimeError {
        let mut core = self.lock_core();
        if core.generation != generation {
            return RealtimeError::Cancelled;
        }

        ConnectionMetrics::record_attempt("auth_error");
        core.reconnect.cancel();
        core.link = None;
        let error = RealtimeError::Auth(message);
        core.last_error = Some(error.to_string());
        tracing::warn!(error = %error, "Realtime connection refused, caller must reconnect with credentials");
        self.set_state(&mut core, ConnectionState::Failed);
        error
    }

    fn handshake_failed(self: &Arc<Self>, generation: u64, err: TransportError) -> RealtimeError {
        if let TransportError::Unauthorized(message) = err {
            return self.fail_auth(generation, message);
        }

        let mut core = self.lock_core();
        if core.generation != generation {
            return RealtimeError::Cancelled;
        }

        ConnectionMetrics::record_attempt("handshake_error");
        let error = RealtimeError::from(err);
        core.last_error = Some(error.to_string());
        tracing::warn!(
            error = %error,
            attempt = core.reconnect.attempts(),
            max_attempts = core.reconnect.max_attempts(),
            will_retry = core.reconnect.attempts_remaining(),
            "Realtime handshake failed"
        );

        self.schedule_reconnect(&mut core);
        error
    }

    /// Arm the next retry, or give up if the ceiling is reached.
    fn schedule_reconnect(self: &Arc<Self>, core: &mut Core) {
        let weak = Arc::downgrade(self);
        let generation = core.generation;

        let decision = core.reconnect.schedule(move |attempt| async move {
            if let Some(inner) = weak.upgrade() {
                inner.run_reconnect(generation, attempt).await;
            }
        });

        match decision {
            ScheduleDecision::Scheduled { .. } | ScheduleDecision::AlreadyPending => {
                self.set_state(core, ConnectionState::Reconnecting);
            }
            ScheduleDecision::Exhausted { attempts } => {
                let error = RealtimeError::ReconnectExhausted { attempts };
                core.last_error = Some(error.to_string());
                tracing::error!(attempts = attempts, "Giving up on realtime connection");
                self.set_state(core, ConnectionState::Failed);
            }
        }
    }

    /// Body of a fired reconnect timer.
    async fn run_reconnect(self: Arc<Self>, generation: u64, attempt: u32) {
        let _gate = self.connect_gate.lock().await;

        {
            let mut core = self.lock_core();
            if core.generation != generation || !core.reconnect.take_fired(attempt) {
                tracing::debug!(attempt = attempt, "Stale reconnect timer ignored");
                return;
            }
        }

        tracing::info!(attempt = attempt, "Attempting reconnect");
        if let Err(e) = self.attempt(generation, AttemptKind::Reconnect).await {
            tracing::debug!(attempt = attempt, error = %e, "Reconnect attempt failed");
        }
    }

    /// Frames only count while their link is the live one.
    fn is_live(&self, generation: u64) -> bool {
        let core = self.lock_core();
        core.generation == generation && core.state.is_connected()
    }

    fn handle_frame(&self, generation: u64, frame: WireFrame) {
        if !self.is_live(generation) {
            tracing::trace!(event = %frame.event, "Ignoring frame from stale link");
            return;
        }

        match frame.event.as_str() {
            protocol::PONG => match serde_json::from_value::<PongPayload>(frame.data) {
                Ok(pong) => {
                    self.latency.record_pong(&pong);
                }
                Err(e) => tracing::warn!(error = %e, "Malformed pong payload"),
            },
            protocol::CONNECTED_ACK => {
                tracing::debug!("Duplicate connection acknowledgement ignored");
            }
            _ => {
                let envelope = EventEnvelope::from(frame);
                self.router.route(&envelope);
            }
        }
    }

    /// Unplanned closure of the live link.
    fn handle_drop(self: &Arc<Self>, generation: u64, reason: CloseReason) {
        let mut core = self.lock_core();
        if core.generation != generation || !core.state.is_connected() {
            return;
        }

        ConnectionMetrics::record_drop();
        let error = RealtimeError::TransportDropped(reason.to_string());
        tracing::warn!(error = %error, "Realtime connection lost");
        core.last_error = Some(error.to_string());

        // Dropping the link aborts this reader's own handle; it returns right after.
        core.link = None;
        core.subscriptions.reset_replay();
        self.schedule_reconnect(&mut core);
    }
}

async fn read_loop(
    inner: Weak<Inner>,
    generation: u64,
    mut inbound: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = inbound.recv().await {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        match event {
            TransportEvent::Frame(frame) => inner.handle_frame(generation, frame),
            TransportEvent::Closed(reason) => {
                inner.handle_drop(generation, reason);
                return;
            }
        }
    }

    if let Some(inner) = inner.upgrade() {
        inner.handle_drop(generation, CloseReason::NetworkError("link closed".to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryServer, MemoryTransport, OpenBehavior};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn memory_client(tokens: impl TokenSupplier + 'static) -> (ConnectionManager, Arc<MemoryTransport>, MemoryServer) {
        let (transport, server) = MemoryTransport::new();
        let transport = Arc::new(transport);
        let config = ConnectionConfig {
            reconnect_base_delay_ms: 1000,
            ..ConnectionConfig::new("memory://dashboard")
        };
        let client = ConnectionManager::new(config, tokens, transport.clone()).unwrap();
        (client, transport, server)
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_token_fails_without_retry() {
        let (client, transport, _server) = memory_client(StaticToken::none());

        let result = client.connect().await;
        assert!(matches!(result, Err(RealtimeError::Auth(_))));
        assert_eq!(client.state(), ConnectionState::Failed);
        assert!(!client.has_pending_reconnect());
        assert_eq!(transport.open_count(), 0);
        assert!(client.last_error().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_token_is_auth_error() {
        let (client, _transport, _server) = memory_client(|| Some("   ".to_string()));
        assert!(matches!(client.connect().await, Err(RealtimeError::Auth(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_is_noop_when_connected() {
        let (client, transport, mut server) = memory_client(StaticToken::new("t"));
        client.connect().await.unwrap();
        let peer = server.next_peer().await.unwrap();
        assert_eq!(peer.request.platform, "web");

        client.connect().await.unwrap();
        assert_eq!(transport.open_count(), 1);
        assert_eq!(client.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connected_notification_dispatched() {
        let (client, _transport, _server) = memory_client(StaticToken::new("t"));
        let connected = Arc::new(AtomicUsize::new(0));
        let c = connected.clone();
        client.register_handler(EventKind::Connected, move |event| {
            assert_eq!(event, &ServerEvent::Connected);
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        client.connect().await.unwrap();
        assert_eq!(connected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_while_disconnected_is_dropped() {
        let (client, _transport, _server) = memory_client(StaticToken::new("t"));
        let result = client.update_case_status("C1", "closed");
        assert!(matches!(
            result,
            Err(RealtimeError::EmitWhileDisconnected { state: ConnectionState::Disconnected, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_is_idempotent() {
        let (client, _transport, mut server) = memory_client(StaticToken::new("t"));
        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnected);

        client.connect().await.unwrap();
        let mut peer = server.next_peer().await.unwrap();
        client.disconnect();
        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(peer.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_timeout_enters_reconnect() {
        let (client, transport, _server) = memory_client(StaticToken::new("t"));
        transport.push_behavior(OpenBehavior::AcceptWithoutAck);

        let result = client.connect().await;
        assert!(matches!(result, Err(RealtimeError::Handshake(ref m)) if m.contains("timed out")));
        assert_eq!(client.state(), ConnectionState::Reconnecting);
        assert!(client.has_pending_reconnect());

        // First retry after the base delay accepts
        let mut states = client.watch_state();
        tokio::time::timeout(
            Duration::from_secs(5),
            states.wait_for(|s| *s == ConnectionState::Connected),
        )
        .await
        .expect("reconnected")
        .unwrap();
        assert_eq!(client.reconnect_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_rejects_credentials() {
        let (client, transport, _server) = memory_client(StaticToken::new("expired"));
        transport.push_behavior(OpenBehavior::Reject(TransportError::Unauthorized("401".into())));

        assert!(matches!(client.connect().await, Err(RealtimeError::Auth(_))));
        assert_eq!(client.state(), ConnectionState::Failed);
        assert!(!client.has_pending_reconnect());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_rejected() {
        let (transport, _server) = MemoryTransport::new();
        let config = ConnectionConfig::new("");
        let result = ConnectionManager::new(config, StaticToken::new("t"), Arc::new(transport));
        assert!(matches!(result, Err(RealtimeError::InvalidConfig(_))));
    }
}
