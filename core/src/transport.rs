//! Executes `HttpRequest`s against the network.
//!
//! `UreqTransport` is the default. It owns a single `ureq::Agent` that is
//! reused for every call, so connections are pooled across operations.

use std::time::Duration;

use tracing::debug;

use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse};

/// Performs one blocking HTTP round-trip.
///
/// Implementations return non-2xx responses as `Ok`; status interpretation
/// belongs to `ApiClient::parse_response`.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Response bodies larger than this fail with `ApiError::Transport` unless
/// raised with `UreqTransport::with_body_limit`.
pub const DEFAULT_BODY_LIMIT: u64 = 10 * 1024 * 1024;

/// Blocking transport backed by `ureq`.
///
/// Bodies are read fully into memory, capped at `DEFAULT_BODY_LIMIT` bytes.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl UreqTransport {
    /// Agent with no timeout.
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self {
            agent,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Agent whose whole round-trip is bounded by `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            agent,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut response = builder.send(request.body.as_bytes())?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| header_pair(name.as_str(), value.as_bytes()))
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_string()?;
        debug!(status, bytes = body.len(), "response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Header values are not guaranteed to be UTF-8; invalid bytes are replaced.
fn header_pair(name: &str, value: &[u8]) -> (String, String) {
    (name.to_string(), String::from_utf8_lossy(value).into_owned())
}
