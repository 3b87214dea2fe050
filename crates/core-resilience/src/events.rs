//! Observability events emitted by the retry loop and circuit breakers
//!
//! Every retry and every circuit transition produces exactly one
//! [`ResilienceEvent`]. Events go to an [`EventSink`]; the default
//! [`TracingSink`] turns them into `tracing` records.

use std::time::Duration;

/// Something the resilience layer did on behalf of a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResilienceEvent {
    /// A failed attempt will be retried after `delay`
    RetryScheduled {
        destination: String,
        /// Number of the retry about to happen (1 = first retry)
        attempt: u32,
        delay: Duration,
        reason: String,
    },
    /// Circuit moved from closed (or half-open) to open; a zero `cooldown`
    /// means an abandoned probe re-armed it for immediate probing
    CircuitOpened {
        destination: String,
        cooldown: Duration,
        reason: String,
    },
    /// Cool-down elapsed, a single probe call is let through
    CircuitHalfOpen { destination: String },
    /// Probe succeeded, calls flow normally again
    CircuitClosed { destination: String },
    /// Call refused without touching the network
    CallRejected {
        destination: String,
        retry_in: Duration,
    },
}

impl ResilienceEvent {
    /// Destination this event concerns
    pub fn destination(&self) -> &str {
        match self {
            ResilienceEvent::RetryScheduled { destination, .. }
            | ResilienceEvent::CircuitOpened { destination, .. }
            | ResilienceEvent::CircuitHalfOpen { destination }
            | ResilienceEvent::CircuitClosed { destination }
            | ResilienceEvent::CallRejected { destination, .. } => destination,
        }
    }
}

/// Receiver for resilience events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ResilienceEvent);
}

/// Default sink: structured `tracing` records
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: ResilienceEvent) {
        match event {
            ResilienceEvent::RetryScheduled {
                destination,
                attempt,
                delay,
                reason,
            } => tracing::warn!(
                %destination,
                attempt,
                delay_ms = delay.as_millis() as u64,
                %reason,
                "Retrying call"
            ),
            ResilienceEvent::CircuitOpened {
                destination,
                cooldown,
                reason,
            } => tracing::warn!(
                %destination,
                cooldown_secs = cooldown.as_secs(),
                %reason,
                "Broken circuit"
            ),
            ResilienceEvent::CircuitHalfOpen { destination } => {
                tracing::info!(%destination, "Half-open circuit, probing")
            }
            ResilienceEvent::CircuitClosed { destination } => {
                tracing::info!(%destination, "Closed circuit")
            }
            ResilienceEvent::CallRejected {
                destination,
                retry_in,
            } => tracing::debug!(
                %destination,
                retry_in_ms = retry_in.as_millis() as u64,
                "Circuit open, failing fast"
            ),
        }
    }
}

/// Sink that keeps every event in memory, handy for assertions
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: std::sync::Mutex<Vec<ResilienceEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far, oldest first
    pub fn events(&self) -> Vec<ResilienceEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ResilienceEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
