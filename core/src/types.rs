//! Request payloads for the remote API.
//!
//! # Design
//! One borrowed struct per endpoint, serialized with the exact wire field
//! names. Optional fields are never skipped: the server expects the key to
//! be present and `null` when the caller has no value.

use serde::Serialize;

/// Body of both token-acquisition endpoints.
#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    #[serde(rename = "appId")]
    pub app_id: &'a str,
    #[serde(rename = "appSecret")]
    pub app_secret: &'a str,
}

/// Body of the project hash and project people endpoints.
#[derive(Debug, Serialize)]
pub struct ProjectQuery<'a> {
    #[serde(rename = "appId")]
    pub app_id: &'a str,
    #[serde(rename = "appToken")]
    pub app_token: &'a str,
    pub onlycode: &'a str,
    pub companyonlycode: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct PersonQuery<'a> {
    #[serde(rename = "appId")]
    pub app_id: &'a str,
    #[serde(rename = "appToken")]
    pub app_token: &'a str,
    pub onlycode: &'a str,
    pub personcode: &'a str,
    pub companyonlycode: Option<&'a str>,
}

/// A single attendance punch as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttendanceRecord {
    /// Project unique code (`onlycode`).
    pub project_code: String,
    /// Worker unique code (`personcode`).
    pub person_code: String,
    /// Attendance device code (`machine`).
    pub device_code: String,
    /// Entry/exit direction (`state`).
    pub direction: String,
    /// Punch time (`time`), passed through verbatim.
    pub timestamp: String,
    /// Captured photo (`images`), typically base64 or a URL.
    pub image: String,
    /// Upload delay in seconds. Sent as `0` when absent.
    pub delay: Option<i64>,
    pub position: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttendancePayload<'a> {
    #[serde(rename = "appId")]
    pub app_id: &'a str,
    #[serde(rename = "appToken")]
    pub app_token: &'a str,
    pub onlycode: &'a str,
    pub personcode: &'a str,
    pub machine: &'a str,
    pub state: &'a str,
    pub time: &'a str,
    pub images: &'a str,
    pub delay: i64,
    pub position: Option<&'a str>,
}

impl<'a> AttendancePayload<'a> {
    pub fn new(app_id: &'a str, app_token: &'a str, record: &'a AttendanceRecord) -> Self {
        Self {
            app_id,
            app_token,
            onlycode: &record.project_code,
            personcode: &record.person_code,
            machine: &record.device_code,
            state: &record.direction,
            time: &record.timestamp,
            images: &record.image,
            delay: record.delay.unwrap_or(0),
            position: record.position.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DevicePayload<'a> {
    #[serde(rename = "appId")]
    pub app_id: &'a str,
    #[serde(rename = "appToken")]
    pub app_token: &'a str,
    pub onlycode: &'a str,
    pub machine: &'a str,
    pub state: &'a str,
    pub companyonlycode: &'a str,
}

/// Body of the dust upload endpoint. Readings are forwarded as a JSON array
/// of whatever shape the caller serializes.
#[derive(Debug, Serialize)]
pub struct DustPayload<'a, D: Serialize> {
    #[serde(rename = "appId")]
    pub app_id: &'a str,
    #[serde(rename = "appToken")]
    pub app_token: &'a str,
    pub onlycode: &'a str,
    pub machine_sn: &'a str,
    #[serde(rename = "yangchenData")]
    pub yangchen_data: &'a [D],
}
