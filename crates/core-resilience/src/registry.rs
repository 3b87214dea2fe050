//! Per-destination circuit breakers
//!
//! One [`CircuitBreaker`] per destination identifier, created lazily on first
//! use and shared by every concurrent caller aimed at that destination.

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use super::events::EventSink;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Registry mapping destination identifiers to their circuit breakers
#[derive(Clone)]
pub struct CircuitRegistry {
    config: CircuitBreakerConfig,
    sink: Arc<dyn EventSink>,
    circuits: Arc<Mutex<HashMap<String, Arc<CircuitBreaker>>>>,
}

impl std::fmt::Debug for CircuitRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitRegistry")
            .field("config", &self.config)
            .field("destinations", &self.all_states())
            .finish()
    }
}

impl CircuitRegistry {
    pub fn new(config: CircuitBreakerConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            sink,
            circuits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get the breaker for `destination`, creating a closed one if needed
    pub fn circuit(&self, destination: &str) -> Arc<CircuitBreaker> {
        let mut circuits = self
            .circuits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        circuits
            .entry(destination.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(
                    destination,
                    self.config.clone(),
                    self.sink.clone(),
                ))
            })
            .clone()
    }

    /// Current state of `destination`'s circuit, if it has been used
    pub fn state_of(&self, destination: &str) -> Option<CircuitState> {
        let circuits = self
            .circuits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        circuits.get(destination).map(|breaker| breaker.state())
    }

    /// Snapshot of every known destination and its state
    pub fn all_states(&self) -> Vec<(String, CircuitState)> {
        let circuits = self
            .circuits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut states: Vec<_> = circuits
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.state()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TracingSink;

    #[tokio::test(start_paused = true)]
    async fn test_same_destination_shares_breaker() {
        let registry = CircuitRegistry::new(CircuitBreakerConfig::default(), Arc::new(TracingSink));

        let a = registry.circuit("pokeapi.co:443");
        let b = registry.circuit("pokeapi.co:443");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test(start_paused = true)]
    async fn test_destinations_are_isolated() {
        let registry = CircuitRegistry::new(CircuitBreakerConfig::default(), Arc::new(TracingSink));

        registry
            .circuit("pokeapi.co:443")
            .acquire()
            .unwrap()
            .record_failure("status code 503");

        assert!(matches!(
            registry.state_of("pokeapi.co:443"),
            Some(CircuitState::Open { .. })
        ));
        assert!(registry.circuit("api.funtranslations.com:443").acquire().is_ok());
        assert_eq!(registry.state_of("unknown:80"), None);
        assert_eq!(registry.all_states().len(), 2);
    }
}
