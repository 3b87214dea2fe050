//! Bardsong Core Resilience: Pure-logic fault tolerance for outbound calls
//!
//! # Overview
//!
//! This crate wraps a single outbound call with two protections:
//!
//! - **Retry**: transient outcomes (configurable status set, transport errors)
//!   are retried, the first retry immediately, later ones after a
//!   decorrelated-jitter backoff
//! - **Circuit Breaker**: one breaker per destination; once it opens, calls
//!   fail fast until a cool-down elapses, then a single probe decides
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of HTTP client libraries.
//! The wrapped call reports what happened through [`AttemptOutcome`]
//! (a status code or a transport error description); everything else about
//! the call's result is passed back to the caller untouched.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Your Application                │
//! └─────────────┬───────────────────────────┘
//!               │
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Retry loop (RetryContext)         │  ← fast first, then jittered
//! │  (max attempts, retryable statuses)     │
//! └─────────────┬───────────────────────────┘
//!               │ every attempt
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │  Circuit Breaker (per destination)      │  ← fail fast while open
//! │  (CircuitRegistry → CircuitBreaker)     │
//! └─────────────┬───────────────────────────┘
//!               │
//!               ▼
//!         Remote destination
//!
//!  Every retry and transition → EventSink (TracingSink by default)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use bardsong_core_resilience::{
//!     AttemptOutcome, CircuitBreakerConfig, ResilienceError, ResiliencePolicy, RetryPolicy,
//! };
//! use std::time::Duration;
//!
//! struct Reply {
//!     status: u16,
//! }
//!
//! impl AttemptOutcome for Reply {
//!     fn status(&self) -> Option<u16> {
//!         Some(self.status)
//!     }
//!     fn transport_error(&self) -> Option<String> {
//!         None
//!     }
//! }
//!
//! # async fn example() -> Result<(), ResilienceError> {
//! let policy = ResiliencePolicy::new(
//!     RetryPolicy {
//!         max_attempts: 6,
//!         backoff_seed: Duration::from_secs(1),
//!         ..Default::default()
//!     },
//!     CircuitBreakerConfig {
//!         failure_threshold: 1,
//!         cooldown: Duration::from_secs(30),
//!     },
//! );
//!
//! let reply = policy
//!     .execute("api.funtranslations.com:443", || async { Reply { status: 200 } })
//!     .await?;
//! assert_eq!(reply.status, 200);
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod circuit_breaker;
pub mod error;
pub mod events;
pub mod policy;
pub mod registry;

// Re-export main types for convenience
pub use backoff::{DecorrelatedJitter, RetryPolicy, DEFAULT_RETRYABLE_STATUSES};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState, Permit};
pub use error::ResilienceError;
pub use events::{EventSink, RecordingSink, ResilienceEvent, TracingSink};
pub use policy::{AttemptOutcome, ResiliencePolicy, RetryContext};
pub use registry::CircuitRegistry;

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use bardsong_core_resilience::prelude::*;
/// ```
pub mod prelude {
    pub use super::backoff::RetryPolicy;
    pub use super::circuit_breaker::{CircuitBreakerConfig, CircuitState};
    pub use super::error::ResilienceError;
    pub use super::events::{EventSink, ResilienceEvent};
    pub use super::policy::{AttemptOutcome, ResiliencePolicy};
}
