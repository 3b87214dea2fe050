/*!
 * Resilient HTTP transport shared by the remote API clients
 *
 * Every request goes through the shared `ResiliencePolicy`. The destination
 * identifier is the URL authority, so each remote API gets its own circuit.
 */

use bardsong_core_resilience::{AttemptOutcome, ResilienceError, ResiliencePolicy};
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::error::Failure;

/// Why a call produced no response
#[derive(Debug)]
pub enum CallError {
    /// Circuit open, the network was not touched
    Rejected(ResilienceError),
    /// Connect error, timeout, broken body, ... on the last attempt
    Transport(reqwest::Error),
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Rejected(err) => write!(f, "{}", err),
            CallError::Transport(err) => write!(f, "{}", describe_reqwest_error(err)),
        }
    }
}

impl std::error::Error for CallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CallError::Rejected(err) => Some(err),
            CallError::Transport(err) => Some(err),
        }
    }
}

impl From<CallError> for Failure {
    fn from(err: CallError) -> Self {
        Failure::Transport(err.to_string())
    }
}

/// One attempt as the resilience policy sees it
struct HttpAttempt(Result<Response, reqwest::Error>);

impl AttemptOutcome for HttpAttempt {
    fn status(&self) -> Option<u16> {
        self.0.as_ref().ok().map(|response| response.status().as_u16())
    }

    fn transport_error(&self) -> Option<String> {
        self.0.as_ref().err().map(describe_reqwest_error)
    }
}

/// `reqwest::Client` wrapped with retry and circuit breaking
#[derive(Clone)]
pub struct ResilientClient {
    client: Client,
    policy: Arc<ResiliencePolicy>,
}

impl fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientClient")
            .field("policy", &self.policy)
            .finish()
    }
}

impl ResilientClient {
    /// Build a client whose every attempt times out after `timeout`
    pub fn new(timeout: Duration, policy: Arc<ResiliencePolicy>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bardsong/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::from_client(client, policy))
    }

    pub fn from_client(client: Client, policy: Arc<ResiliencePolicy>) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &ResiliencePolicy {
        &self.policy
    }

    /// GET `url` through the resilience policy
    ///
    /// Any response, including a final 5xx after retries, is returned as is;
    /// only the absence of a response is an error.
    pub async fn get(&self, url: &Url) -> Result<Response, CallError> {
        let destination = destination_of(url);

        let attempt = self
            .policy
            .execute(&destination, || {
                let request = self
                    .client
                    .get(url.clone())
                    .header(ACCEPT, "application/json");
                async move { HttpAttempt(request.send().await) }
            })
            .await
            .map_err(CallError::Rejected)?;

        attempt.0.map_err(CallError::Transport)
    }
}

/// Circuit key for a URL: `host:port`
pub fn destination_of(url: &Url) -> String {
    match (url.host_str(), url.port_or_known_default()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => url.as_str().to_string(),
    }
}

fn describe_reqwest_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timeout: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    }
}
