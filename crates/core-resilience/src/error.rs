//! Error types for the resilience crate

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the resilience layer itself (never by the wrapped call)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResilienceError {
    /// Circuit breaker for the destination is open, the call was not attempted
    #[error("Circuit breaker for {destination} is open, retry in {retry_in:?}")]
    CircuitOpen {
        destination: String,
        retry_in: Duration,
    },
}

impl ResilienceError {
    /// Destination the rejected call was aimed at
    pub fn destination(&self) -> &str {
        match self {
            ResilienceError::CircuitOpen { destination, .. } => destination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_open_display() {
        let err = ResilienceError::CircuitOpen {
            destination: "pokeapi.co:443".to_string(),
            retry_in: Duration::from_secs(12),
        };
        assert_eq!(
            err.to_string(),
            "Circuit breaker for pokeapi.co:443 is open, retry in 12s"
        );
        assert_eq!(err.destination(), "pokeapi.co:443");
    }
}
