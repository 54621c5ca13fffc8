#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use schooldesk_client::api::SchoolApi;
use schooldesk_client::config::ClientConfig;
use schooldesk_core::types::DbId;
use schooldesk_worker::config::WorkerConfig;

pub const STUDENT: DbId = 42;

pub const TASKS: &str = "/tasks";
pub const HOMEWORK: &str = "/homework";
pub const FLAGS: &str = "/attendance/flags";

/// Read-only school API serving the three dashboard lists.
#[derive(Debug, Default)]
pub struct MockSchool {
    pub tasks: Vec<Value>,
    pub homework: Vec<Value>,
    pub flags: Vec<Value>,
    /// Paths answering 503 until removed.
    pub failing: HashSet<&'static str>,
    /// Requests received per path, failed ones included.
    pub calls: HashMap<&'static str, usize>,
}

pub type SharedMock = Arc<Mutex<MockSchool>>;

pub fn shared(mock: MockSchool) -> SharedMock {
    Arc::new(Mutex::new(mock))
}

pub async fn spawn(mock: SharedMock) -> String {
    let app = Router::new()
        .route(TASKS, get(|State(m): State<SharedMock>| async move { list(&m, TASKS) }))
        .route(HOMEWORK, get(|State(m): State<SharedMock>| async move { list(&m, HOMEWORK) }))
        .route(FLAGS, get(|State(m): State<SharedMock>| async move { list(&m, FLAGS) }))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn list(mock: &SharedMock, path: &'static str) -> Response {
    let mut state = mock.lock().unwrap();
    *state.calls.entry(path).or_default() += 1;
    if state.failing.contains(path) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "injected failure", "code": "INTERNAL_ERROR"})),
        )
            .into_response();
    }
    let items = match path {
        TASKS => state.tasks.clone(),
        HOMEWORK => state.homework.clone(),
        _ => state.flags.clone(),
    };
    Json(Value::Array(items)).into_response()
}

pub fn calls(mock: &SharedMock, path: &str) -> usize {
    mock.lock().unwrap().calls.get(path).copied().unwrap_or(0)
}

pub fn worker_config(base_url: impl Into<String>, refresh_interval: Duration) -> WorkerConfig {
    let mut client = ClientConfig::new(base_url);
    client.request_timeout = Duration::from_secs(2);
    WorkerConfig {
        client,
        student_id: STUDENT,
        refresh_interval,
        locale: "en".to_string(),
    }
}

pub async fn connect(mock: SharedMock, refresh_interval: Duration) -> (SchoolApi, WorkerConfig) {
    let config = worker_config(spawn(mock).await, refresh_interval);
    let api = SchoolApi::new(&config.client).unwrap();
    (api, config)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn task(id: DbId) -> Value {
    json!({
        "id": id, "title": format!("Task {id}"), "status": "PENDING",
        "created_at": "2024-08-30T10:00:00Z",
        "assigned_to": STUDENT, "assigned_by": 2
    })
}

pub fn homework(id: DbId, status: &str) -> Value {
    json!({
        "id": id, "title": format!("Homework {id}"), "subject": "math", "total_points": 10,
        "submission": {"id": id * 10, "student_id": STUDENT, "status": status}
    })
}

pub fn flag(id: DbId) -> Value {
    json!({
        "id": id, "student_id": STUDENT, "attendance_date": "2024-08-29",
        "created_at": "2024-08-29T16:00:00Z", "status": "pending"
    })
}

pub fn seeded() -> SharedMock {
    shared(MockSchool {
        tasks: vec![task(1)],
        homework: vec![homework(10, "pending")],
        flags: vec![flag(5)],
        ..MockSchool::default()
    })
}
