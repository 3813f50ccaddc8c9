//! Synchronous client for the nanhai attendance and dust monitoring API.
//!
//! # Overview
//! `ApiClient` authenticates with an app id/secret pair, exchanges it for
//! short-lived tokens, and forwards project, worker, attendance and dust
//! requests to fixed JSON POST endpoints. Each call returns the decoded
//! response body directly.
//!
//! # Design
//! - `ApiClient` holds only its `ClientConfig` and a `Transport`; it keeps no
//!   state between calls and does not cache or refresh tokens.
//! - Every operation has a `build_*` twin producing a plain `HttpRequest`,
//!   and `parse_response` decodes a plain `HttpResponse`, so a host can run
//!   the HTTP round-trip itself.
//! - Payload DTOs are defined independently from the mock-server crate;
//!   integration tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use client::{decode_body, ApiClient};
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use http::{HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport, DEFAULT_BODY_LIMIT};
pub use types::AttendanceRecord;
