//! Prometheus metrics for the realtime client.
//!
//! - Connection metrics (state, attempts, reconnects)
//! - Event metrics (dispatched per kind, handler failures, dropped emits)
//! - Latency of the last ping/pong round-trip

mod helpers;

pub use helpers::{encode_metrics, ConnectionMetrics, EventMetrics, LatencyMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge_vec, IntCounter,
    IntCounterVec, IntGaugeVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "fieldops_realtime";

lazy_static! {
    // ============================================================================
    // Connection Metrics
    // ============================================================================

    /// Current connection state per endpoint (0=disconnected, 1=connecting, 2=connected, 3=reconnecting, 4=failed)
    pub static ref CONNECTION_STATE: IntGaugeVec = register_int_gauge_vec!(
        format!("{}_connection_state", METRIC_PREFIX),
        "Current connection state (0=disconnected, 1=connecting, 2=connected, 3=reconnecting, 4=failed)",
        &["endpoint"]
    ).unwrap();

    /// Handshake attempts by outcome
    pub static ref CONNECT_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_connect_attempts_total", METRIC_PREFIX),
        "Total handshake attempts",
        &["outcome"]
    ).unwrap();

    /// Reconnect timers scheduled
    pub static ref RECONNECTS_SCHEDULED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_reconnects_scheduled_total", METRIC_PREFIX),
        "Total reconnect attempts scheduled after an unplanned disconnect"
    ).unwrap();

    /// Unplanned transport closures
    pub static ref TRANSPORT_DROPS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_transport_drops_total", METRIC_PREFIX),
        "Total unexpected transport closures"
    ).unwrap();

    // ============================================================================
    // Event Metrics
    // ============================================================================

    /// Inbound events handed to a handler
    pub static ref EVENTS_DISPATCHED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_events_dispatched_total", METRIC_PREFIX),
        "Total inbound events delivered to a handler",
        &["event"]
    ).unwrap();

    /// Inbound events with no handler or an unknown name
    pub static ref EVENTS_UNHANDLED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_events_unhandled_total", METRIC_PREFIX),
        "Total inbound events dropped without a handler"
    ).unwrap();

    /// Handler errors and panics
    pub static ref HANDLER_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_handler_failures_total", METRIC_PREFIX),
        "Total handler failures caught at the dispatch boundary",
        &["event"]
    ).unwrap();

    /// Outbound events dropped because the connection was not open
    pub static ref EMITS_DROPPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_emits_dropped_total", METRIC_PREFIX),
        "Total outbound events dropped while not connected"
    ).unwrap();

    // ============================================================================
    // Latency Metrics
    // ============================================================================

    /// Last measured round-trip time per endpoint
    pub static ref LATENCY_MS: IntGaugeVec = register_int_gauge_vec!(
        format!("{}_latency_ms", METRIC_PREFIX),
        "Last measured ping/pong round-trip in milliseconds",
        &["endpoint"]
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection_manager::ConnectionState;

    #[test]
    fn test_metrics_encode() {
        ConnectionMetrics::record_attempt("success");
        EventMetrics::record_dispatched("notification");
        let text = encode_metrics().unwrap();
        assert!(text.contains("fieldops_realtime_connect_attempts_total"));
        assert!(text.contains("fieldops_realtime_events_dispatched_total"));
    }

    #[test]
    fn test_state_gauge_per_endpoint() {
        ConnectionMetrics::set_state("wss://state-a.test/rt", ConnectionState::Connected);
        ConnectionMetrics::set_state("wss://state-b.test/rt", ConnectionState::Failed);

        assert_eq!(CONNECTION_STATE.with_label_values(&["wss://state-a.test/rt"]).get(), 2);
        assert_eq!(CONNECTION_STATE.with_label_values(&["wss://state-b.test/rt"]).get(), 4);
    }
}
