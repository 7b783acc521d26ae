//! Reconnect scheduling after unplanned disconnects.
//!
//! The scheduler owns the attempt counter and the one outstanding retry
//! timer. It never decides *whether* a drop was planned; the connection
//! manager only calls it for drops and failed handshakes.

mod backoff;

pub use backoff::{BackoffConfig, ExponentialBackoff};

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::metrics::ConnectionMetrics;

/// Result of asking for another reconnect attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleDecision {
    /// Timer armed for `attempt`, firing after `delay`
    Scheduled { attempt: u32, delay: Duration },
    /// A timer is already pending; nothing was armed
    AlreadyPending,
    /// Ceiling reached; no further attempts until an explicit connect
    Exhausted { attempts: u32 },
}

struct PendingReconnect {
    attempt: u32,
    handle: JoinHandle<()>,
}

pub struct ReconnectScheduler {
    backoff: ExponentialBackoff,
    max_attempts: u32,
    attempts: u32,
    pending: Option<PendingReconnect>,
}

impl ReconnectScheduler {
    pub fn new(backoff: ExponentialBackoff, max_attempts: u32) -> Self {
        Self {
            backoff,
            max_attempts,
            attempts: 0,
            pending: None,
        }
    }

    /// Arm the timer for the next attempt.
    ///
    /// `on_fire` runs on a spawned task once the delay has elapsed and
    /// receives the attempt number. Must be called within a tokio runtime.
    pub fn schedule<F, Fut>(&mut self, on_fire: F) -> ScheduleDecision
    where
        F: FnOnce(u32) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.has_pending() {
            return ScheduleDecision::AlreadyPending;
        }
        if self.attempts >= self.max_attempts {
            return ScheduleDecision::Exhausted {
                attempts: self.attempts,
            };
        }

        self.attempts += 1;
        let attempt = self.attempts;
        let delay = self.backoff.delay_for_attempt(attempt);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire(attempt).await;
        });
        self.pending = Some(PendingReconnect { attempt, handle });
        ConnectionMetrics::record_reconnect_scheduled();

        tracing::info!(
            attempt = attempt,
            max_attempts = self.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Reconnect scheduled"
        );

        ScheduleDecision::Scheduled { attempt, delay }
    }

    /// Called by the timer task when it fires. Returns `false` if the timer
    /// for `attempt` is no longer the pending one.
    pub fn take_fired(&mut self, attempt: u32) -> bool {
        match &self.pending {
            Some(pending) if pending.attempt == attempt => {
                // The task is the caller; dropping the handle detaches it.
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Abort the pending timer, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
            tracing::debug!(attempt = pending.attempt, "Pending reconnect cancelled");
        }
    }

    /// Cancel and zero the attempt counter.
    pub fn reset(&mut self) {
        self.cancel();
        self.attempts = 0;
    }

    pub fn has_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.handle.is_finished())
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether a failed attempt may be followed by another one
    pub fn attempts_remaining(&self) -> bool {
        self.attempts < self.max_attempts
    }
}

impl Drop for ReconnectScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
