//! Round-trip latency over the active link.
//!
//! A ping carrying the sender's epoch-millis timestamp goes out every
//! interval while connected; the matching pong yields the sample. Only the
//! most recent sample is kept.

use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::{ClientEvent, PongPayload, WireFrame};
use crate::metrics::LatencyMetrics;

/// Last measured round-trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySample {
    pub round_trip_ms: u64,
    pub measured_at: DateTime<Utc>,
}

pub struct LatencyMonitor {
    /// Metric label for this client's samples
    endpoint: String,
    latest: RwLock<Option<LatencySample>>,
}

impl LatencyMonitor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            latest: RwLock::new(None),
        }
    }

    /// Spawn the ping loop for one link.
    ///
    /// The loop ends when the outbound channel closes or the returned handle
    /// is aborted; the connection manager aborts it as soon as the link
    /// leaves `Connected`.
    pub fn start(&self, interval: Duration, outbound: mpsc::UnboundedSender<WireFrame>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // Skip immediate first tick
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let ping = ClientEvent::Ping {
                    timestamp: Utc::now().timestamp_millis(),
                };
                if outbound.send(ping.into_frame()).is_err() {
                    tracing::debug!("Ping loop stopped, link closed");
                    break;
                }
                tracing::trace!("Latency ping sent");
            }
        })
    }

    /// Record the sample for a pong. Returns the sample stored.
    pub fn record_pong(&self, pong: &PongPayload) -> LatencySample {
        self.record_pong_at(pong, Utc::now())
    }

    fn record_pong_at(&self, pong: &PongPayload, now: DateTime<Utc>) -> LatencySample {
        // Clock skew between ping and pong must not produce a negative sample
        let round_trip_ms = (now.timestamp_millis() - pong.timestamp()).max(0) as u64;
        let sample = LatencySample {
            round_trip_ms,
            measured_at: now,
        };

        if let Ok(mut latest) = self.latest.write() {
            *latest = Some(sample);
        }
        LatencyMetrics::record_round_trip_ms(&self.endpoint, round_trip_ms);
        tracing::debug!(latency_ms = round_trip_ms, "Latency measured");
        sample
    }

    pub fn latest(&self) -> Option<LatencySample> {
        self.latest.read().ok().and_then(|latest| *latest)
    }
}
