//! Error types for the nanhai API client.
//!
//! # Design
//! Configuration problems are reported at construction time and never again.
//! Everything after that is either the network (`Transport`), the server
//! (`HttpError`), or the body itself (`Deserialization`). A body that is
//! empty is not an error; see `decode_body`.

use thiserror::Error;

/// Errors returned by `ApiClient` and its building blocks.
#[derive(Debug, Error)]
pub enum ApiError {
    /// `app_id` or `app_secret` was empty.
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTP client failed before a response was received.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server returned a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body was non-empty but not valid JSON.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

/// Alias for `Result` with `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;
