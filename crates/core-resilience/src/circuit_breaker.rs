//! Circuit Breaker implementation for fault tolerance
//!
//! The circuit breaker prevents hammering a destination that is already
//! failing. It has three states:
//! - Closed: Normal operation, calls pass through
//! - Open: Destination is unhealthy, calls fail immediately until the cool-down elapses
//! - HalfOpen: Cool-down elapsed, exactly one probe call is in flight
//!
//! All transitions happen under a single lock, so concurrent failures produce
//! one winner for every Open/Closed decision.

use super::error::ResilienceError;
use super::events::{EventSink, ResilienceEvent};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// State of the circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, calls pass through normally
    Closed,
    /// Circuit is open, calls fail immediately
    /// Next probe time indicates when a half-open probe is allowed
    Open { next_probe: Instant },
    /// Circuit is half-open, one probe call is testing the destination
    HalfOpen,
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive qualifying failures before opening the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before a probe is allowed
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 1,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Internal state of the circuit breaker
#[derive(Debug)]
struct CircuitBreakerState {
    state: CircuitState,
    consecutive_failures: u32,
}

/// Circuit breaker guarding one destination
///
/// # Example
/// ```
/// use bardsong_core_resilience::{CircuitBreaker, CircuitBreakerConfig, TracingSink};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() {
///     let breaker = CircuitBreaker::new(
///         "pokeapi.co:443",
///         CircuitBreakerConfig::default(),
///         Arc::new(TracingSink),
///     );
///
///     let permit = breaker.acquire().expect("closed circuit lets calls through");
///     // ... perform the call ...
///     permit.record_success();
/// }
/// ```
pub struct CircuitBreaker {
    destination: String,
    config: CircuitBreakerConfig,
    state: Mutex<CircuitBreakerState>,
    sink: Arc<dyn EventSink>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("destination", &self.destination)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a closed circuit breaker for `destination`
    pub fn new(
        destination: impl Into<String>,
        config: CircuitBreakerConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            destination: destination.into(),
            config,
            state: Mutex::new(CircuitBreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
            }),
            sink,
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Get the current state of the circuit breaker
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Get current consecutive failure count
    pub fn failure_count(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Reset the circuit breaker to closed state
    pub fn reset(&self) {
        let mut state = self.lock();
        state.state = CircuitState::Closed;
        state.consecutive_failures = 0;
    }

    /// Ask for permission to make one call
    ///
    /// Returns a [`Permit`] the caller settles with the call's outcome, or
    /// [`ResilienceError::CircuitOpen`] when the call must fail fast.
    pub fn acquire(&self) -> Result<Permit<'_>, ResilienceError> {
        let now = Instant::now();

        let decision = {
            let mut state = self.lock();
            match state.state {
                CircuitState::Closed => Ok(false),
                CircuitState::Open { next_probe } if now >= next_probe => {
                    state.state = CircuitState::HalfOpen;
                    Ok(true)
                }
                CircuitState::Open { next_probe } => Err(next_probe.duration_since(now)),
                // a probe is already in flight
                CircuitState::HalfOpen => Err(Duration::ZERO),
            }
        };

        match decision {
            Ok(probe) => {
                if probe {
                    self.sink.emit(ResilienceEvent::CircuitHalfOpen {
                        destination: self.destination.clone(),
                    });
                }
                Ok(Permit {
                    breaker: self,
                    probe,
                    settled: false,
                })
            }
            Err(retry_in) => {
                self.sink.emit(ResilienceEvent::CallRejected {
                    destination: self.destination.clone(),
                    retry_in,
                });
                Err(ResilienceError::CircuitOpen {
                    destination: self.destination.clone(),
                    retry_in,
                })
            }
        }
    }

    /// Handle a call that did not produce a qualifying failure
    ///
    /// While half-open only the probe decides; calls admitted before the
    /// circuit opened may still be settling and are ignored.
    fn on_success(&self, probe: bool) {
        let closed = {
            let mut state = self.lock();
            match state.state {
                CircuitState::Closed => {
                    state.consecutive_failures = 0;
                    false
                }
                CircuitState::HalfOpen if probe => {
                    state.state = CircuitState::Closed;
                    state.consecutive_failures = 0;
                    true
                }
                CircuitState::HalfOpen => false,
                // opened by a concurrent call, that decision stands
                CircuitState::Open { .. } => false,
            }
        };

        if closed {
            self.sink.emit(ResilienceEvent::CircuitClosed {
                destination: self.destination.clone(),
            });
        }
    }

    /// Handle a qualifying failure
    fn on_failure(&self, reason: &str, probe: bool) {
        let opened = {
            let mut state = self.lock();
            match state.state {
                CircuitState::Closed => {
                    state.consecutive_failures += 1;
                    if state.consecutive_failures >= self.config.failure_threshold {
                        state.state = CircuitState::Open {
                            next_probe: Instant::now() + self.config.cooldown,
                        };
                        state.consecutive_failures = 0;
                        true
                    } else {
                        false
                    }
                }
                CircuitState::HalfOpen if probe => {
                    state.state = CircuitState::Open {
                        next_probe: Instant::now() + self.config.cooldown,
                    };
                    true
                }
                CircuitState::HalfOpen => false,
                CircuitState::Open { .. } => false,
            }
        };

        if opened {
            self.sink.emit(ResilienceEvent::CircuitOpened {
                destination: self.destination.clone(),
                cooldown: self.config.cooldown,
                reason: reason.to_string(),
            });
        }
    }

    /// Probe dropped before it resolved: allow the next caller to probe
    fn on_abandoned_probe(&self) {
        let rearmed = {
            let mut state = self.lock();
            if state.state == CircuitState::HalfOpen {
                state.state = CircuitState::Open {
                    next_probe: Instant::now(),
                };
                true
            } else {
                false
            }
        };

        if rearmed {
            self.sink.emit(ResilienceEvent::CircuitOpened {
                destination: self.destination.clone(),
                cooldown: Duration::ZERO,
                reason: "probe abandoned".to_string(),
            });
        }
    }

    fn lock(&self) -> MutexGuard<'_, CircuitBreakerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Permission for one call through a [`CircuitBreaker`]
///
/// Settle it with [`Permit::record_success`] or [`Permit::record_failure`].
/// A probe permit dropped unsettled (the call was cancelled) re-arms the circuit.
#[must_use = "a permit must be settled with the outcome of the call"]
#[derive(Debug)]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl Permit<'_> {
    /// Whether this call is the half-open probe
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.probe);
    }

    pub fn record_failure(mut self, reason: &str) {
        self.settled = true;
        self.breaker.on_failure(reason, self.probe);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.on_abandoned_probe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;

    fn breaker_with(
        failure_threshold: u32,
        cooldown: Duration,
    ) -> (CircuitBreaker, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let breaker = CircuitBreaker::new(
            "species",
            CircuitBreakerConfig {
                failure_threshold,
                cooldown,
            },
            sink.clone(),
        );
        (breaker, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_circuit_breaker_closed_to_open() {
        let (breaker, sink) = breaker_with(3, Duration::from_secs(30));

        for _ in 0..3 {
            breaker.acquire().unwrap().record_failure("status code 503");
        }

        match breaker.state() {
            CircuitState::Open { .. } => (),
            state => panic!("Expected Open state, got {:?}", state),
        }
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, ResilienceEvent::CircuitOpened { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_failure_opens_with_default_config() {
        let sink = Arc::new(RecordingSink::new());
        let breaker = CircuitBreaker::new("species", CircuitBreakerConfig::default(), sink);

        breaker.acquire().unwrap().record_failure("status code 500");

        let err = breaker.acquire().unwrap_err();
        match err {
            ResilienceError::CircuitOpen { retry_in, .. } => {
                assert_eq!(retry_in, Duration::from_secs(30))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_consecutive_failures() {
        let (breaker, _) = breaker_with(2, Duration::from_secs(30));

        breaker.acquire().unwrap().record_failure("boom");
        assert_eq!(breaker.failure_count(), 1);
        breaker.acquire().unwrap().record_success();
        assert_eq!(breaker.failure_count(), 0);
        breaker.acquire().unwrap().record_failure("boom");

        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_allows_exactly_one_probe() {
        let (breaker, sink) = breaker_with(1, Duration::from_secs(30));
        breaker.acquire().unwrap().record_failure("boom");

        tokio::time::advance(Duration::from_secs(31)).await;

        let probe = breaker.acquire().unwrap();
        assert!(probe.is_probe());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.acquire().is_err());

        probe.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);

        let events = sink.events();
        assert!(events
            .iter()
            .any(|e| matches!(e, ResilienceEvent::CircuitHalfOpen { .. })));
        assert!(matches!(
            events.last(),
            Some(ResilienceEvent::CircuitClosed { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_reopens_for_full_cooldown() {
        let (breaker, _) = breaker_with(1, Duration::from_secs(30));
        breaker.acquire().unwrap().record_failure("boom");

        tokio::time::advance(Duration::from_secs(30)).await;
        breaker.acquire().unwrap().record_failure("still down");

        match breaker.acquire() {
            Err(ResilienceError::CircuitOpen { retry_in, .. }) => {
                assert_eq!(retry_in, Duration::from_secs(30))
            }
            other => panic!("Expected fast failure, got {:?}", other.map(|p| p.is_probe())),
        };
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_probe_rearms_circuit() {
        let (breaker, sink) = breaker_with(1, Duration::from_secs(30));
        breaker.acquire().unwrap().record_failure("boom");
        tokio::time::advance(Duration::from_secs(30)).await;

        drop(breaker.acquire().unwrap());

        let next = breaker.acquire().unwrap();
        assert!(next.is_probe());
        next.record_success();

        let rearmed: Vec<_> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ResilienceEvent::CircuitOpened {
                    cooldown, reason, ..
                } if reason == "probe abandoned" => Some(cooldown),
                _ => None,
            })
            .collect();
        assert_eq!(rearmed, vec![Duration::ZERO]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_success_does_not_settle_half_open() {
        let (breaker, sink) = breaker_with(1, Duration::from_secs(30));

        // admitted while closed, still in flight when the circuit opens
        let slow = breaker.acquire().unwrap();
        assert!(!slow.is_probe());
        breaker.acquire().unwrap().record_failure("status code 503");

        tokio::time::advance(Duration::from_secs(31)).await;
        let probe = breaker.acquire().unwrap();
        assert!(probe.is_probe());

        slow.record_success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.acquire().is_err());

        probe.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        let closed = sink
            .events()
            .iter()
            .filter(|e| matches!(e, ResilienceEvent::CircuitClosed { .. }))
            .count();
        assert_eq!(closed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_failure_leaves_half_open_state_alone() {
        let (breaker, _) = breaker_with(1, Duration::from_secs(30));

        let slow = breaker.acquire().unwrap();
        breaker.acquire().unwrap().record_failure("status code 503");

        tokio::time::advance(Duration::from_secs(31)).await;
        let probe = breaker.acquire().unwrap();

        slow.record_failure("timeout");
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        probe.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_open_once_and_admit_one_caller() {
        const CALLERS: usize = 16;
        let sink = Arc::new(RecordingSink::new());
        let breaker = Arc::new(CircuitBreaker::new(
            "species",
            CircuitBreakerConfig {
                failure_threshold: 1,
                cooldown: Duration::from_millis(100),
            },
            sink.clone(),
        ));

        // every caller holds a permit before any of them fails
        let barrier = Arc::new(tokio::sync::Barrier::new(CALLERS));
        let mut handles = Vec::new();
        for _ in 0..CALLERS {
            let breaker = breaker.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                let permit = breaker.acquire().unwrap();
                barrier.wait().await;
                permit.record_failure("status code 503");
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let opened = sink
            .events()
            .iter()
            .filter(|e| matches!(e, ResilienceEvent::CircuitOpened { .. }))
            .count();
        assert_eq!(opened, 1);
        assert!(matches!(breaker.state(), CircuitState::Open { .. }));

        tokio::time::sleep(Duration::from_millis(150)).await;

        // everyone asks before anyone settles
        let barrier = Arc::new(tokio::sync::Barrier::new(CALLERS));
        let mut handles = Vec::new();
        for _ in 0..CALLERS {
            let breaker = breaker.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                let permit = breaker.acquire();
                let admitted = permit.as_ref().map(|p| p.is_probe()).ok();
                barrier.wait().await;
                if let Ok(permit) = permit {
                    permit.record_success();
                }
                admitted
            }));
        }
        let mut admitted = Vec::new();
        for handle in handles {
            if let Some(is_probe) = handle.await.unwrap() {
                admitted.push(is_probe);
            }
        }

        assert_eq!(admitted, vec![true]);
        assert_eq!(breaker.state(), CircuitState::Closed);
        let half_open = sink
            .events()
            .iter()
            .filter(|e| matches!(e, ResilienceEvent::CircuitHalfOpen { .. }))
            .count();
        assert_eq!(half_open, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset() {
        let (breaker, _) = breaker_with(1, Duration::from_secs(30));
        breaker.acquire().unwrap().record_failure("boom");

        breaker.reset();

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }
}
