//! HTTP transport types.
//!
//! # Design
//! Requests and responses are plain data. `ApiClient::build_*` produces an
//! `HttpRequest`, a `Transport` turns it into an `HttpResponse`, and
//! `ApiClient::parse_response` decodes that. Hosts that want to own the
//! network can skip `Transport` and run the round-trip themselves.
//!
//! Every endpoint of the remote API is a JSON POST, so there is no method
//! field.

/// A JSON POST request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    pub(crate) fn post_json(url: String, body: String) -> Self {
        Self {
            url,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        }
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
