//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    CONNECTION_STATE, CONNECT_ATTEMPTS_TOTAL, EMITS_DROPPED_TOTAL, EVENTS_DISPATCHED_TOTAL,
    EVENTS_UNHANDLED_TOTAL, HANDLER_FAILURES_TOTAL, LATENCY_MS, RECONNECTS_SCHEDULED_TOTAL,
    TRANSPORT_DROPS_TOTAL,
};
use crate::connection_manager::ConnectionState;

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording connection metrics
pub struct ConnectionMetrics;

impl ConnectionMetrics {
    pub fn set_state(endpoint: &str, state: ConnectionState) {
        let value = match state {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Reconnecting => 3,
            ConnectionState::Failed => 4,
        };
        CONNECTION_STATE.with_label_values(&[endpoint]).set(value);
    }

    /// Record a handshake attempt (`success`, `auth_error`, `handshake_error`)
    pub fn record_attempt(outcome: &str) {
        CONNECT_ATTEMPTS_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn record_reconnect_scheduled() {
        RECONNECTS_SCHEDULED_TOTAL.inc();
    }

    pub fn record_drop() {
        TRANSPORT_DROPS_TOTAL.inc();
    }
}

/// Helper struct for recording event metrics
pub struct EventMetrics;

impl EventMetrics {
    pub fn record_dispatched(event: &str) {
        EVENTS_DISPATCHED_TOTAL.with_label_values(&[event]).inc();
    }

    pub fn record_unhandled() {
        EVENTS_UNHANDLED_TOTAL.inc();
    }

    pub fn record_handler_failure(event: &str) {
        HANDLER_FAILURES_TOTAL.with_label_values(&[event]).inc();
    }

    pub fn record_emit_dropped() {
        EMITS_DROPPED_TOTAL.inc();
    }
}

/// Helper struct for recording latency metrics
pub struct LatencyMetrics;

impl LatencyMetrics {
    pub fn record_round_trip_ms(endpoint: &str, ms: u64) {
        LATENCY_MS.with_label_values(&[endpoint]).set(ms as i64);
    }
}
