/*!
 * Failure taxonomy for Bardsong
 *
 * Every fallible operation in the pipeline returns [`Result<T>`], i.e. either
 * its value or exactly one [`Failure`]. Failures are values, never panics.
 */

use std::fmt;

pub type Result<T> = std::result::Result<T, Failure>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_NOT_FOUND: i32 = 2;
pub const EXIT_RATE_LIMITED: i32 = 3;
pub const EXIT_CONFIG: i32 = 4;

/// Closed set of reasons a description request can fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Requested species does not exist (or has nothing to describe)
    NotFound,

    /// Remote quota exhausted
    RateLimited,

    /// Network or HTTP-layer failure, detail kept for diagnostics
    Transport(String),

    /// Anything not otherwise classified; reaching a caller means a defect
    Unexpected(String),
}

impl Failure {
    /// A 2xx response that carried no usable payload
    pub fn missing_payload(destination: &str) -> Self {
        Failure::Unexpected(format!(
            "{} answered successfully without a usable payload",
            destination
        ))
    }

    /// Whether this failure should never reach a caller in a healthy pipeline
    pub fn is_defect(&self) -> bool {
        matches!(self, Failure::Transport(_) | Failure::Unexpected(_))
    }

    /// Get the process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Failure::NotFound => EXIT_NOT_FOUND,
            Failure::RateLimited => EXIT_RATE_LIMITED,
            Failure::Transport(_) | Failure::Unexpected(_) => EXIT_FAILURE,
        }
    }

    /// HTTP status an inbound endpoint should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            Failure::NotFound => 400,
            Failure::RateLimited => 429,
            Failure::Transport(_) | Failure::Unexpected(_) => 500,
        }
    }

    /// Short stable label, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::NotFound => "not_found",
            Failure::RateLimited => "rate_limited",
            Failure::Transport(_) => "transport",
            Failure::Unexpected(_) => "unexpected",
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::NotFound => write!(f, "Species not found"),
            Failure::RateLimited => write!(f, "Too many requests"),
            Failure::Transport(detail) => write!(f, "Transport failure: {}", detail),
            Failure::Unexpected(detail) => write!(f, "Unexpected failure: {}", detail),
        }
    }
}

impl std::error::Error for Failure {}

impl From<bardsong_core_resilience::ResilienceError> for Failure {
    fn from(err: bardsong_core_resilience::ResilienceError) -> Self {
        Failure::Transport(err.to_string())
    }
}
