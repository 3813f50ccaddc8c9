//! Connection settings for the remote API.
//!
//! `ClientConfig` is validated once, on construction or deserialization, and
//! is immutable afterwards.

use std::fmt;

use serde::Deserialize;

use crate::error::{ApiError, Result};

/// Base URL and application credentials.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawClientConfig")]
pub struct ClientConfig {
    base_url: String,
    app_id: String,
    app_secret: String,
}

#[derive(Deserialize)]
struct RawClientConfig {
    base_url: String,
    app_id: String,
    app_secret: String,
}

impl TryFrom<RawClientConfig> for ClientConfig {
    type Error = ApiError;

    fn try_from(raw: RawClientConfig) -> Result<Self> {
        ClientConfig::new(&raw.base_url, &raw.app_id, &raw.app_secret)
    }
}

impl ClientConfig {
    /// Build a config, stripping trailing `/` from `base_url`.
    ///
    /// Fails with `ApiError::Config` if `app_id` or `app_secret` is empty.
    pub fn new(base_url: &str, app_id: &str, app_secret: &str) -> Result<Self> {
        if app_id.is_empty() {
            return Err(ApiError::config("appId must not be empty"));
        }
        if app_secret.is_empty() {
            return Err(ApiError::config("appSecret must not be empty"));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            app_secret: app_secret.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn app_secret(&self) -> &str {
        &self.app_secret
    }

    /// Join `path` onto the base URL. `path` starts with `/`.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .finish()
    }
}
