use std::{collections::HashSet, sync::Arc};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const APP_ID: &str = "test-app";
pub const APP_SECRET: &str = "test-secret";
pub const PROJECT_CODE: &str = "2b94-c63a-af67c7ae";
pub const PROJECT_HASH: &str = "9f724a01d11f1e21";
pub const COMPANY_CODE: &str = "C-001";
pub const OTHER_COMPANY_CODE: &str = "C-002";

pub const CODE_OK: i64 = 0;
pub const CODE_BAD_CREDENTIALS: i64 = 1001;
pub const CODE_BAD_TOKEN: i64 = 1002;
pub const CODE_UNKNOWN_PROJECT: i64 = 1003;
pub const CODE_UNKNOWN_PERSON: i64 = 1004;
pub const CODE_BAD_STATE: i64 = 1005;
pub const CODE_NO_READINGS: i64 = 1006;

const UTF8_BOM: &str = "\u{feff}";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Worker {
    pub personcode: String,
    pub name: String,
    pub companyonlycode: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    pub onlycode: String,
    pub machine: String,
    pub state: String,
    pub companyonlycode: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Punch {
    pub personcode: String,
    pub machine: String,
    pub state: String,
    pub time: String,
    pub delay: i64,
    pub position: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DustUpload {
    pub onlycode: String,
    pub machine_sn: String,
    pub readings: Vec<Value>,
}

/// In-memory state behind the mock endpoints.
#[derive(Debug, Default)]
pub struct Store {
    pub attendance_tokens: HashSet<String>,
    pub dust_tokens: HashSet<String>,
    pub workers: Vec<Worker>,
    pub devices: Vec<Device>,
    pub punches: Vec<Punch>,
    pub dust: Vec<DustUpload>,
}

impl Store {
    /// One project with two workers in two companies.
    pub fn seeded() -> Self {
        Self {
            workers: vec![
                Worker {
                    personcode: "W-001".to_string(),
                    name: "Chen Wei".to_string(),
                    companyonlycode: COMPANY_CODE.to_string(),
                },
                Worker {
                    personcode: "W-002".to_string(),
                    name: "Li Na".to_string(),
                    companyonlycode: OTHER_COMPANY_CODE.to_string(),
                },
            ],
            ..Self::default()
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Deserialize)]
pub struct TokenRequest {
    #[serde(rename = "appId")]
    pub app_id: String,
    #[serde(rename = "appSecret")]
    pub app_secret: String,
}

#[derive(Deserialize)]
pub struct ProjectQuery {
    #[serde(rename = "appId")]
    pub app_id: String,
    #[serde(rename = "appToken")]
    pub app_token: String,
    pub onlycode: String,
    pub companyonlycode: Option<String>,
}

#[derive(Deserialize)]
pub struct PersonQuery {
    #[serde(rename = "appId")]
    pub app_id: String,
    #[serde(rename = "appToken")]
    pub app_token: String,
    pub onlycode: String,
    pub personcode: String,
    pub companyonlycode: Option<String>,
}

#[derive(Deserialize)]
pub struct AttendanceRequest {
    #[serde(rename = "appId")]
    pub app_id: String,
    #[serde(rename = "appToken")]
    pub app_token: String,
    pub onlycode: String,
    pub personcode: String,
    pub machine: String,
    pub state: String,
    pub time: String,
    pub images: String,
    pub delay: i64,
    pub position: Option<String>,
}

#[derive(Deserialize)]
pub struct DeviceRequest {
    #[serde(rename = "appId")]
    pub app_id: String,
    #[serde(rename = "appToken")]
    pub app_token: String,
    pub onlycode: String,
    pub machine: String,
    pub state: String,
    pub companyonlycode: String,
}

#[derive(Deserialize)]
pub struct DustRequest {
    #[serde(rename = "appId")]
    pub app_id: String,
    #[serde(rename = "appToken")]
    pub app_token: String,
    pub onlycode: String,
    pub machine_sn: String,
    #[serde(rename = "yangchenData")]
    pub yangchen_data: Vec<Value>,
}

pub fn app() -> Router {
    app_with(Arc::new(RwLock::new(Store::seeded())))
}

/// Router over a caller-owned store, so tests can inspect what was recorded.
pub fn app_with(db: Db) -> Router {
    Router::new()
        .route("/Api/MachineThird/getTokenByAppRequest", post(attendance_token))
        .route("/Api/MachineThird/getProjectHash", post(project_hash))
        .route("/Api/MachineThird/getProjectPeople", post(project_people))
        .route("/Api/MachineThird/getPersonInfo", post(person_info))
        .route("/Api/MachineThird/record", post(record_attendance))
        .route("/Api/MachineThird/addMachine", post(add_machine))
        .route("/Api/YangchenThird/getTokenByAppRequest", post(dust_token))
        .route("/Api/YangchenThird/receiveYCData", post(receive_dust))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// JSON envelope with a leading BOM, as the real service sends it.
fn reply(code: i64, msg: &str, data: Value) -> Response {
    let body = json!({ "code": code, "msg": msg, "data": data });
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        format!("{UTF8_BOM}{body}"),
    )
        .into_response()
}

fn success(data: Value) -> Response {
    reply(CODE_OK, "success", data)
}

fn issue_token(tokens: &mut HashSet<String>) -> String {
    let token = Uuid::new_v4().simple().to_string();
    tokens.insert(token.clone());
    token
}

/// Checks shared by every business call. Returns the rejection to send, if any.
fn authorize(tokens: &HashSet<String>, app_id: &str, app_token: &str) -> Option<Response> {
    if app_id != APP_ID {
        return Some(reply(CODE_BAD_CREDENTIALS, "unknown appId", Value::Null));
    }
    if !tokens.contains(app_token) {
        return Some(reply(CODE_BAD_TOKEN, "invalid appToken", Value::Null));
    }
    None
}

fn unknown_project() -> Response {
    reply(CODE_UNKNOWN_PROJECT, "project not found", Value::Null)
}

fn credentials_match(input: &TokenRequest) -> bool {
    input.app_id == APP_ID && input.app_secret == APP_SECRET
}

async fn attendance_token(State(db): State<Db>, Json(input): Json<TokenRequest>) -> Response {
    if !credentials_match(&input) {
        return reply(CODE_BAD_CREDENTIALS, "appId or appSecret mismatch", Value::Null);
    }
    let token = issue_token(&mut db.write().await.attendance_tokens);
    info!("issued attendance token");
    success(json!({ "appToken": token }))
}

async fn dust_token(State(db): State<Db>, Json(input): Json<TokenRequest>) -> Response {
    if !credentials_match(&input) {
        return reply(CODE_BAD_CREDENTIALS, "appId or appSecret mismatch", Value::Null);
    }
    let token = issue_token(&mut db.write().await.dust_tokens);
    info!("issued dust token");
    success(json!({ "appToken": token }))
}

async fn project_hash(State(db): State<Db>, Json(input): Json<ProjectQuery>) -> Response {
    let store = db.read().await;
    if let Some(rejection) = authorize(&store.attendance_tokens, &input.app_id, &input.app_token) {
        return rejection;
    }
    if input.onlycode != PROJECT_CODE {
        return unknown_project();
    }
    success(json!({
        "onlycode": input.onlycode,
        "companyonlycode": input.companyonlycode,
        "hash": PROJECT_HASH,
    }))
}

async fn project_people(State(db): State<Db>, Json(input): Json<ProjectQuery>) -> Response {
    let store = db.read().await;
    if let Some(rejection) = authorize(&store.attendance_tokens, &input.app_id, &input.app_token) {
        return rejection;
    }
    if input.onlycode != PROJECT_CODE {
        return unknown_project();
    }
    let workers: Vec<&Worker> = store
        .workers
        .iter()
        .filter(|w| match &input.companyonlycode {
            Some(company) => &w.companyonlycode == company,
            None => true,
        })
        .collect();
    success(json!(workers))
}

async fn person_info(State(db): State<Db>, Json(input): Json<PersonQuery>) -> Response {
    let store = db.read().await;
    if let Some(rejection) = authorize(&store.attendance_tokens, &input.app_id, &input.app_token) {
        return rejection;
    }
    if input.onlycode != PROJECT_CODE {
        return unknown_project();
    }
    let found = store.workers.iter().find(|w| {
        w.personcode == input.personcode
            && input
                .companyonlycode
                .as_ref()
                .map_or(true, |company| &w.companyonlycode == company)
    });
    match found {
        Some(worker) => success(json!(worker)),
        None => reply(CODE_UNKNOWN_PERSON, "person not found", Value::Null),
    }
}

async fn record_attendance(
    State(db): State<Db>,
    Json(input): Json<AttendanceRequest>,
) -> Response {
    let mut store = db.write().await;
    if let Some(rejection) = authorize(&store.attendance_tokens, &input.app_id, &input.app_token) {
        return rejection;
    }
    if input.onlycode != PROJECT_CODE {
        return unknown_project();
    }
    if !store.workers.iter().any(|w| w.personcode == input.personcode) {
        return reply(CODE_UNKNOWN_PERSON, "person not found", Value::Null);
    }
    debug!(bytes = input.images.len(), "attendance image received");
    store.punches.push(Punch {
        personcode: input.personcode,
        machine: input.machine,
        state: input.state,
        time: input.time,
        delay: input.delay,
        position: input.position,
    });
    success(json!({ "recorded": store.punches.len() }))
}

async fn add_machine(State(db): State<Db>, Json(input): Json<DeviceRequest>) -> Response {
    let mut store = db.write().await;
    if let Some(rejection) = authorize(&store.attendance_tokens, &input.app_id, &input.app_token) {
        return rejection;
    }
    if input.onlycode != PROJECT_CODE {
        return unknown_project();
    }
    if input.state != "in" && input.state != "out" {
        return reply(CODE_BAD_STATE, "state must be in or out", Value::Null);
    }
    let device = Device {
        onlycode: input.onlycode,
        machine: input.machine,
        state: input.state,
        companyonlycode: input.companyonlycode,
    };
    match store.devices.iter().position(|d| d.machine == device.machine) {
        Some(index) => store.devices[index] = device.clone(),
        None => store.devices.push(device.clone()),
    }
    success(json!(device))
}

async fn receive_dust(State(db): State<Db>, Json(input): Json<DustRequest>) -> Response {
    let mut store = db.write().await;
    if let Some(rejection) = authorize(&store.dust_tokens, &input.app_id, &input.app_token) {
        return rejection;
    }
    if input.onlycode != PROJECT_CODE {
        return unknown_project();
    }
    if input.yangchen_data.is_empty() {
        return reply(CODE_NO_READINGS, "yangchenData is empty", Value::Null);
    }
    let accepted = input.yangchen_data.len();
    store.dust.push(DustUpload {
        onlycode: input.onlycode,
        machine_sn: input.machine_sn,
        readings: input.yangchen_data,
    });
    success(json!({ "accepted": accepted }))
}
