//! Retry + circuit breaker around a single outbound call
//!
//! The retry loop is the outer layer, the destination's circuit breaker the
//! inner one: every attempt asks the breaker for a permit and reports its
//! outcome back. A rejected attempt ends the call at once; the rejection is
//! not retried.
//!
//! The wrapped call returns whatever it returns (a response, or an error
//! value). The policy only needs to know, through [`AttemptOutcome`], whether
//! that outcome is a transient failure. After the last attempt the final
//! outcome is handed back unchanged, so callers see the same shape whether
//! or not retries happened.

use super::backoff::{DecorrelatedJitter, RetryPolicy};
use super::circuit_breaker::CircuitBreakerConfig;
use super::error::ResilienceError;
use super::events::{EventSink, ResilienceEvent, TracingSink};
use super::registry::CircuitRegistry;
use std::future::Future;
use std::sync::Arc;

/// What the policy needs to know about one attempt's outcome
pub trait AttemptOutcome {
    /// Status code, when the attempt produced a response
    fn status(&self) -> Option<u16>;

    /// Description of the transport failure (connect error, timeout, ...),
    /// when the attempt produced no response at all
    fn transport_error(&self) -> Option<String>;
}

/// Per-call retry state
#[derive(Debug)]
pub struct RetryContext {
    destination: String,
    attempt: u32,
    max_attempts: u32,
    backoff: DecorrelatedJitter,
}

impl RetryContext {
    pub fn new(destination: impl Into<String>, policy: &RetryPolicy) -> Self {
        Self {
            destination: destination.into(),
            attempt: 0,
            max_attempts: policy.max_attempts.max(1),
            backoff: policy.backoff(),
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Attempts started so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn can_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }

    fn begin_attempt(&mut self) {
        self.attempt += 1;
    }
}

/// Retry with decorrelated-jitter backoff plus per-destination circuit breaking
///
/// # Example
/// ```no_run
/// use bardsong_core_resilience::{AttemptOutcome, ResiliencePolicy};
///
/// struct Status(u16);
///
/// impl AttemptOutcome for Status {
///     fn status(&self) -> Option<u16> {
///         Some(self.0)
///     }
///     fn transport_error(&self) -> Option<String> {
///         None
///     }
/// }
///
/// # async fn example() -> Result<(), bardsong_core_resilience::ResilienceError> {
/// let policy = ResiliencePolicy::default();
/// let outcome = policy.execute("pokeapi.co:443", || async { Status(200) }).await?;
/// assert_eq!(outcome.0, 200);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ResiliencePolicy {
    retry: RetryPolicy,
    circuits: CircuitRegistry,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for ResiliencePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResiliencePolicy")
            .field("retry", &self.retry)
            .field("circuits", &self.circuits)
            .finish()
    }
}

impl Default for ResiliencePolicy {
    fn default() -> Self {
        Self::new(RetryPolicy::default(), CircuitBreakerConfig::default())
    }
}

impl ResiliencePolicy {
    /// Policy reporting its events through `tracing`
    pub fn new(retry: RetryPolicy, circuit: CircuitBreakerConfig) -> Self {
        Self::with_sink(retry, circuit, Arc::new(TracingSink))
    }

    pub fn with_sink(
        retry: RetryPolicy,
        circuit: CircuitBreakerConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            retry,
            circuits: CircuitRegistry::new(circuit, sink.clone()),
            sink,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn circuits(&self) -> &CircuitRegistry {
        &self.circuits
    }

    /// Why `outcome` is worth retrying, or `None` if it is final
    pub fn transient_reason<R: AttemptOutcome>(&self, outcome: &R) -> Option<String> {
        if let Some(error) = outcome.transport_error() {
            return Some(error);
        }
        outcome
            .status()
            .filter(|status| self.retry.is_retryable_status(*status))
            .map(|status| format!("status code {}", status))
    }

    /// Run `op` against `destination` with retries and circuit breaking
    ///
    /// Returns the first non-transient outcome, or the last transient one
    /// once attempts are exhausted. Fails with
    /// [`ResilienceError::CircuitOpen`] when the destination's circuit
    /// refuses an attempt. Dropping the returned future cancels the current
    /// attempt and any pending backoff.
    pub async fn execute<F, Fut, R>(&self, destination: &str, mut op: F) -> Result<R, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = R>,
        R: AttemptOutcome,
    {
        let circuit = self.circuits.circuit(destination);
        let mut context = RetryContext::new(destination, &self.retry);

        loop {
            context.begin_attempt();
            let permit = circuit.acquire()?;

            let outcome = op().await;

            let Some(reason) = self.transient_reason(&outcome) else {
                permit.record_success();
                return Ok(outcome);
            };
            permit.record_failure(&reason);

            if !context.can_retry() {
                tracing::debug!(
                    destination,
                    attempts = context.attempt(),
                    %reason,
                    "Retries exhausted"
                );
                return Ok(outcome);
            }

            let delay = context.backoff.next_delay();
            self.sink.emit(ResilienceEvent::RetryScheduled {
                destination: context.destination().to_string(),
                attempt: context.attempt(),
                delay,
                reason,
            });
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
