//! Request builder, executor and response decoder for the nanhai API.
//!
//! # Design
//! Each remote operation is split into a `build_*` method that produces an
//! `HttpRequest` and a shared `parse_response` that consumes the
//! `HttpResponse`. The operation methods (`get_app_token`, `add_device`, ...)
//! glue the two together through the client's `Transport` and hand the
//! decoded body straight back to the caller. Nothing from a previous call is
//! kept on the client.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    AttendancePayload, AttendanceRecord, DevicePayload, DustPayload, PersonQuery, ProjectQuery,
    TokenRequest,
};

pub const APP_TOKEN_PATH: &str = "/Api/MachineThird/getTokenByAppRequest";
pub const PROJECT_HASH_PATH: &str = "/Api/MachineThird/getProjectHash";
pub const PROJECT_PEOPLE_PATH: &str = "/Api/MachineThird/getProjectPeople";
pub const PERSON_INFO_PATH: &str = "/Api/MachineThird/getPersonInfo";
pub const ATTENDANCE_PATH: &str = "/Api/MachineThird/record";
pub const ADD_MACHINE_PATH: &str = "/Api/MachineThird/addMachine";
pub const DUST_TOKEN_PATH: &str = "/Api/YangchenThird/getTokenByAppRequest";
pub const DUST_DATA_PATH: &str = "/Api/YangchenThird/receiveYCData";

const UTF8_BOM: char = '\u{feff}';

/// Synchronous client for the attendance and dust monitoring API.
///
/// Tokens are not cached: fetch one with `get_app_token` (or
/// `get_dust_app_token` for dust uploads) and pass it to each call.
pub struct ApiClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl ApiClient<UreqTransport> {
    /// Create a client with a default `ureq` transport.
    ///
    /// Fails with `ApiError::Config` if `app_id` or `app_secret` is empty.
    pub fn new(base_url: &str, app_id: &str, app_secret: &str) -> Result<Self> {
        let config = ClientConfig::new(base_url, app_id, app_secret)?;
        Ok(Self::with_transport(config, UreqTransport::new()))
    }
}

impl<T> ApiClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn build_get_app_token(&self) -> Result<HttpRequest> {
        self.build(APP_TOKEN_PATH, &self.token_request())
    }

    pub fn build_get_project_hash(
        &self,
        token: &str,
        project_code: &str,
        company_code: Option<&str>,
    ) -> Result<HttpRequest> {
        self.build(
            PROJECT_HASH_PATH,
            &self.project_query(token, project_code, company_code),
        )
    }

    pub fn build_get_project_workers(
        &self,
        token: &str,
        project_code: &str,
        company_code: Option<&str>,
    ) -> Result<HttpRequest> {
        self.build(
            PROJECT_PEOPLE_PATH,
            &self.project_query(token, project_code, company_code),
        )
    }

    pub fn build_get_project_worker_info(
        &self,
        token: &str,
        project_code: &str,
        person_code: &str,
        company_code: Option<&str>,
    ) -> Result<HttpRequest> {
        let payload = PersonQuery {
            app_id: self.config.app_id(),
            app_token: token,
            onlycode: project_code,
            personcode: person_code,
            companyonlycode: company_code,
        };
        self.build(PERSON_INFO_PATH, &payload)
    }

    pub fn build_add_attendance(
        &self,
        token: &str,
        record: &AttendanceRecord,
    ) -> Result<HttpRequest> {
        let payload = AttendancePayload::new(self.config.app_id(), token, record);
        self.build(ATTENDANCE_PATH, &payload)
    }

    pub fn build_add_device(
        &self,
        token: &str,
        project_code: &str,
        device_code: &str,
        state: &str,
        company_code: &str,
    ) -> Result<HttpRequest> {
        let payload = DevicePayload {
            app_id: self.config.app_id(),
            app_token: token,
            onlycode: project_code,
            machine: device_code,
            state,
            companyonlycode: company_code,
        };
        self.build(ADD_MACHINE_PATH, &payload)
    }

    pub fn build_get_dust_app_token(&self) -> Result<HttpRequest> {
        self.build(DUST_TOKEN_PATH, &self.token_request())
    }

    pub fn build_add_dust_record<D: Serialize>(
        &self,
        token: &str,
        project_code: &str,
        device_code: &str,
        readings: &[D],
    ) -> Result<HttpRequest> {
        let payload = DustPayload {
            app_id: self.config.app_id(),
            app_token: token,
            onlycode: project_code,
            machine_sn: device_code,
            yangchen_data: readings,
        };
        self.build(DUST_DATA_PATH, &payload)
    }

    /// Check the status and decode the body.
    ///
    /// Non-2xx statuses become `ApiError::HttpError`. See `decode_body` for
    /// how the body itself is treated.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Option<Value>> {
        if !response.is_success() {
            warn!(status = response.status, "request rejected by server");
            return Err(ApiError::HttpError {
                status: response.status,
                body: response.body,
            });
        }
        decode_body(&response.body)
    }

    fn build<P: Serialize>(&self, path: &str, payload: &P) -> Result<HttpRequest> {
        let body =
            serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest::post_json(self.config.url(path), body))
    }

    fn token_request(&self) -> TokenRequest<'_> {
        TokenRequest {
            app_id: self.config.app_id(),
            app_secret: self.config.app_secret(),
        }
    }

    fn project_query<'a>(
        &'a self,
        token: &'a str,
        project_code: &'a str,
        company_code: Option<&'a str>,
    ) -> ProjectQuery<'a> {
        ProjectQuery {
            app_id: self.config.app_id(),
            app_token: token,
            onlycode: project_code,
            companyonlycode: company_code,
        }
    }
}

impl<T: Transport> ApiClient<T> {
    /// Request an attendance (real-name system) token.
    pub fn get_app_token(&self) -> Result<Option<Value>> {
        self.send(self.build_get_app_token()?)
    }

    /// Fetch the hash of a project, optionally scoped to one company.
    pub fn get_project_hash(
        &self,
        token: &str,
        project_code: &str,
        company_code: Option<&str>,
    ) -> Result<Option<Value>> {
        self.send(self.build_get_project_hash(token, project_code, company_code)?)
    }

    /// List the workers of a project. `None` for `company_code` means every
    /// company on the project.
    pub fn get_project_workers(
        &self,
        token: &str,
        project_code: &str,
        company_code: Option<&str>,
    ) -> Result<Option<Value>> {
        self.send(self.build_get_project_workers(token, project_code, company_code)?)
    }

    pub fn get_project_worker_info(
        &self,
        token: &str,
        project_code: &str,
        person_code: &str,
        company_code: Option<&str>,
    ) -> Result<Option<Value>> {
        self.send(self.build_get_project_worker_info(
            token,
            project_code,
            person_code,
            company_code,
        )?)
    }

    /// Upload one attendance punch.
    pub fn add_attendance(&self, token: &str, record: &AttendanceRecord) -> Result<Option<Value>> {
        self.send(self.build_add_attendance(token, record)?)
    }

    /// Register an attendance device. `state` is `in` for an entry gate and
    /// `out` for an exit gate.
    pub fn add_device(
        &self,
        token: &str,
        project_code: &str,
        device_code: &str,
        state: &str,
        company_code: &str,
    ) -> Result<Option<Value>> {
        self.send(self.build_add_device(token, project_code, device_code, state, company_code)?)
    }

    /// Request a dust monitoring token. It is not interchangeable with the
    /// attendance token.
    pub fn get_dust_app_token(&self) -> Result<Option<Value>> {
        self.send(self.build_get_dust_app_token()?)
    }

    pub fn add_dust_record<D: Serialize>(
        &self,
        token: &str,
        project_code: &str,
        device_code: &str,
        readings: &[D],
    ) -> Result<Option<Value>> {
        self.send(self.build_add_dust_record(token, project_code, device_code, readings)?)
    }

    fn send(&self, request: HttpRequest) -> Result<Option<Value>> {
        let path = request
            .url
            .strip_prefix(self.config.base_url())
            .unwrap_or(&request.url);
        debug!(path, "POST");
        let response = self.transport.execute(&request)?;
        self.parse_response(response)
    }
}

impl<T> fmt::Debug for ApiClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Decode a response body as JSON.
///
/// UTF-8 byte-order marks and whitespace are trimmed from both ends first.
/// A body with nothing left yields `Ok(None)`; a non-empty body that is not
/// JSON yields `ApiError::Deserialization`.
pub fn decode_body(body: &str) -> Result<Option<Value>> {
    let body = body.trim_matches(|c: char| c == UTF8_BOM || c.is_whitespace());
    if body.is_empty() {
        return Ok(None);
    }
    match serde_json::from_str(body) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(error = %e, "response body is not valid JSON");
            Err(ApiError::Deserialization(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};

    use serde_json::json;

    use super::*;

    /// Records every request and replays canned responses in order.
    #[derive(Default)]
    struct RecordingTransport {
        requests: RefCell<Vec<HttpRequest>>,
        responses: RefCell<VecDeque<HttpResponse>>,
    }

    impl RecordingTransport {
        fn replying(bodies: &[&str]) -> Self {
            let transport = Self::default();
            for body in bodies {
                transport.responses.borrow_mut().push_back(ok(body));
            }
            transport
        }

        fn last_body(&self) -> Value {
            let requests = self.requests.borrow();
            let last = requests.last().expect("no request sent");
            serde_json::from_str(&last.body).unwrap()
        }
    }

    impl Transport for RecordingTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.requests.borrow_mut().push(request.clone());
            Ok(self
                .responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| ok("")))
        }
    }

    fn ok(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    fn client_with(transport: RecordingTransport) -> ApiClient<RecordingTransport> {
        let config = ClientConfig::new("http://localhost:3000/", "app-1", "secret-1").unwrap();
        ApiClient::with_transport(config, transport)
    }

    fn client() -> ApiClient<RecordingTransport> {
        client_with(RecordingTransport::default())
    }

    fn body_of(req: &HttpRequest) -> Value {
        serde_json::from_str(&req.body).unwrap()
    }

    #[test]
    fn new_rejects_empty_credentials() {
        assert!(matches!(
            ApiClient::new("http://host", "", "secret").unwrap_err(),
            ApiError::Config(_)
        ));
        assert!(matches!(
            ApiClient::new("http://host", "app", "").unwrap_err(),
            ApiError::Config(_)
        ));
    }

    #[test]
    fn build_get_app_token_produces_correct_request() {
        let req = client().build_get_app_token().unwrap();
        assert_eq!(
            req.url,
            "http://localhost:3000/Api/MachineThird/getTokenByAppRequest"
        );
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        assert_eq!(
            body_of(&req),
            json!({"appId": "app-1", "appSecret": "secret-1"})
        );
    }

    #[test]
    fn build_get_dust_app_token_uses_dust_path() {
        let req = client().build_get_dust_app_token().unwrap();
        assert_eq!(
            req.url,
            "http://localhost:3000/Api/YangchenThird/getTokenByAppRequest"
        );
        assert_eq!(
            body_of(&req),
            json!({"appId": "app-1", "appSecret": "secret-1"})
        );
    }

    #[test]
    fn build_get_project_hash_sends_null_company() {
        let req = client()
            .build_get_project_hash("tok", "P-001", None)
            .unwrap();
        assert!(req.url.ends_with("/Api/MachineThird/getProjectHash"));
        assert_eq!(
            body_of(&req),
            json!({
                "appId": "app-1",
                "appToken": "tok",
                "onlycode": "P-001",
                "companyonlycode": null
            })
        );
    }

    #[test]
    fn build_get_project_workers_with_company() {
        let req = client()
            .build_get_project_workers("tok", "P-001", Some("C-7"))
            .unwrap();
        assert!(req.url.ends_with("/Api/MachineThird/getProjectPeople"));
        assert_eq!(body_of(&req)["companyonlycode"], "C-7");
    }

    #[test]
    fn build_get_project_worker_info_includes_person() {
        let req = client()
            .build_get_project_worker_info("tok", "P-001", "W-42", None)
            .unwrap();
        assert!(req.url.ends_with("/Api/MachineThird/getPersonInfo"));
        let body = body_of(&req);
        assert_eq!(body["personcode"], "W-42");
        assert_eq!(body.as_object().unwrap().len(), 5);
    }

    #[test]
    fn build_add_device_has_required_company() {
        let req = client()
            .build_add_device("tok", "P-001", "GATE-1", "in", "C-7")
            .unwrap();
        assert!(req.url.ends_with("/Api/MachineThird/addMachine"));
        assert_eq!(
            body_of(&req),
            json!({
                "appId": "app-1",
                "appToken": "tok",
                "onlycode": "P-001",
                "machine": "GATE-1",
                "state": "in",
                "companyonlycode": "C-7"
            })
        );
    }

    #[test]
    fn add_attendance_sends_default_delay() {
        let c = client_with(RecordingTransport::replying(&[r#"{"code":0}"#]));
        let record = AttendanceRecord {
            project_code: "P-001".to_string(),
            person_code: "W-42".to_string(),
            device_code: "GATE-1".to_string(),
            direction: "in".to_string(),
            timestamp: "2022-07-18 08:00:00".to_string(),
            image: "aW1n".to_string(),
            delay: None,
            position: None,
        };
        let result = c.add_attendance("tok", &record).unwrap();
        assert_eq!(result, Some(json!({"code": 0})));

        let requests = c.transport().requests.borrow();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.ends_with("/Api/MachineThird/record"));
        drop(requests);

        let body = c.transport().last_body();
        assert_eq!(body["delay"], 0);
        assert!(body["position"].is_null());
        assert_eq!(body["time"], "2022-07-18 08:00:00");
    }

    #[test]
    fn add_dust_record_posts_readings_array() {
        let c = client_with(RecordingTransport::replying(&[r#"{"code":0}"#]));
        let readings = vec![json!({"pm25": 12.5, "noise": 60})];
        c.add_dust_record("dust-tok", "P-001", "SN-9", &readings)
            .unwrap();
        let body = c.transport().last_body();
        assert_eq!(body["machine_sn"], "SN-9");
        assert_eq!(body["appToken"], "dust-tok");
        assert_eq!(body["yangchenData"], json!([{"pm25": 12.5, "noise": 60}]));
    }

    #[test]
    fn sequential_calls_return_independent_results() {
        let c = client_with(RecordingTransport::replying(&[
            r#"{"data":"first"}"#,
            r#"{"data":"second"}"#,
        ]));
        let first = c.get_app_token().unwrap();
        let second = c.get_project_hash("tok", "P-001", None).unwrap();
        assert_eq!(first, Some(json!({"data": "first"})));
        assert_eq!(second, Some(json!({"data": "second"})));
    }

    #[test]
    fn fresh_client_has_sent_nothing() {
        let c = client();
        assert!(c.transport().requests.borrow().is_empty());
    }

    #[test]
    fn parse_response_strips_bom() {
        let result = client()
            .parse_response(ok("\u{feff}{\"a\":1}"))
            .unwrap();
        assert_eq!(result, Some(json!({"a": 1})));
    }

    #[test]
    fn parse_response_empty_is_none() {
        assert_eq!(client().parse_response(ok("")).unwrap(), None);
        assert_eq!(client().parse_response(ok("\u{feff}")).unwrap(), None);
    }

    #[test]
    fn parse_response_scalar_and_array() {
        assert_eq!(client().parse_response(ok("42")).unwrap(), Some(json!(42)));
        assert_eq!(
            client().parse_response(ok("[1,2]")).unwrap(),
            Some(json!([1, 2]))
        );
    }

    #[test]
    fn parse_response_bad_json() {
        let err = client().parse_response(ok("<html>")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn parse_response_error_status() {
        let response = HttpResponse {
            status: 500,
            headers: Vec::new(),
            body: "internal error".to_string(),
        };
        let err = client().parse_response(response).unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 500, .. }));
    }

    #[test]
    fn parse_response_strips_trailing_bom() {
        let result = client()
            .parse_response(ok("\u{feff}{\"a\":1}\u{feff}"))
            .unwrap();
        assert_eq!(result, Some(json!({"a": 1})));
    }

    #[test]
    fn parse_response_whitespace_only_is_none() {
        assert_eq!(client().parse_response(ok("\r\n")).unwrap(), None);
        assert_eq!(client().parse_response(ok("\u{feff} \n")).unwrap(), None);
    }

    #[test]
    fn unserializable_reading_is_rejected_before_sending() {
        let c = client();
        let mut reading = HashMap::new();
        reading.insert((1, 2), 3);
        let err = c
            .add_dust_record("dust-tok", "P-001", "SN-9", &[reading])
            .unwrap_err();
        assert!(matches!(err, ApiError::Serialization(_)), "{err}");
        assert!(c.transport().requests.borrow().is_empty());
    }

    #[test]
    fn client_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiClient>();
        assert_send_sync::<ClientConfig>();
    }

    #[test]
    fn debug_hides_secret() {
        let rendered = format!("{:?}", client());
        assert!(rendered.contains("app-1"));
        assert!(!rendered.contains("secret-1"));
    }
}
