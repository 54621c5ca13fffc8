#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;

use schooldesk_client::api::SchoolApi;
use schooldesk_client::config::ClientConfig;
use schooldesk_core::attendance::AbsenceFlag;
use schooldesk_core::error::CoreError;
use schooldesk_core::homework::{HomeworkAssignment, HomeworkRecord, StudentSubmission};
use schooldesk_core::localize::Translations;
use schooldesk_core::status::{FlagStatus, TaskStatus};
use schooldesk_core::task::{DailyTask, TaskPriority};
use schooldesk_core::types::{DbId, Timestamp, UserId};

/// User id the mock records as reviewer on rated tasks.
pub const REVIEWER: UserId = 99;

/// User id the mock records as the staff member clearing flags.
pub const STAFF: UserId = 500;

pub const ASSIGNEE: UserId = 7;

pub const STUDENT: DbId = 42;

/// In-memory state behind the mock school API.
#[derive(Debug, Default)]
pub struct MockSchool {
    pub tasks: Vec<DailyTask>,
    pub flags: Vec<AbsenceFlag>,
    pub homework: Vec<HomeworkRecord>,
    /// POST requests received, including rejected ones.
    pub transition_calls: usize,
    /// GET requests received.
    pub list_calls: usize,
    /// Applied to every POST before it is processed.
    pub delay: Option<Duration>,
    /// Status code returned, once, by the next request.
    pub fail_next: Option<u16>,
    pub last_request_id: Option<String>,
    pub last_authorization: Option<String>,
}

pub type SharedMock = Arc<Mutex<MockSchool>>;

pub fn shared(mock: MockSchool) -> SharedMock {
    Arc::new(Mutex::new(mock))
}

/// Serve the mock on an ephemeral local port and return its base URL.
pub async fn spawn(mock: SharedMock) -> String {
    let app = Router::new()
        .route("/tasks", get(list_tasks))
        .route("/tasks/{id}/start", post(start_task))
        .route("/tasks/{id}/done", post(mark_task_done))
        .route("/tasks/{id}/rate", post(rate_task))
        .route("/homework", get(list_homework))
        .route("/attendance/flags", get(list_flags))
        .route("/attendance/flags/{id}/clear", post(clear_flag))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Spawn the mock and build a client for it with the given timeout.
pub async fn connect(mock: SharedMock, timeout: Duration) -> SchoolApi {
    let mut config = ClientConfig::new(spawn(mock).await);
    config.api_token = Some("test-token".to_string());
    config.request_timeout = timeout;
    SchoolApi::new(&config).unwrap()
}

pub fn snapshot<T>(mock: &SharedMock, f: impl FnOnce(&MockSchool) -> T) -> T {
    f(&mock.lock().unwrap())
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn fixed_now() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 9, 2, 10, 0, 0).unwrap()
}

pub fn pending_task(id: DbId) -> DailyTask {
    DailyTask {
        id,
        title: format!("Task {id}"),
        title_translations: Translations::new(),
        description: None,
        status: TaskStatus::Pending,
        priority: TaskPriority::Medium,
        due_date: None,
        created_at: fixed_now(),
        started_at: None,
        completed_at: None,
        reviewed_at: None,
        assigned_to: ASSIGNEE,
        assigned_by: REVIEWER,
        user_notes: None,
        admin_notes: None,
        rating: None,
        rating_feedback: None,
        rated_by: None,
    }
}

pub fn pending_flag(id: DbId, day: u32) -> AbsenceFlag {
    AbsenceFlag {
        id,
        student_id: STUDENT,
        subject_name: Some("Mathematics".to_string()),
        attendance_date: NaiveDate::from_ymd_opt(2024, 9, day).unwrap(),
        created_at: fixed_now(),
        status: FlagStatus::Pending,
        clearance_reason: None,
        clearance_notes: None,
        cleared_by: None,
        cleared_at: None,
    }
}

pub fn homework(
    id: DbId,
    subject: &str,
    status: Option<&str>,
    score: Option<f64>,
    points: f64,
) -> HomeworkRecord {
    HomeworkRecord {
        assignment: HomeworkAssignment {
            id,
            title: format!("Homework {id}"),
            title_translations: Translations::new(),
            subject: subject.to_string(),
            grade_id: None,
            class_id: Some(3),
            due_date: None,
            total_points: Some(points),
            allow_late_submissions: false,
        },
        submission: status.map(|s| StudentSubmission {
            id: id * 10,
            student_id: STUDENT,
            status: s.to_string(),
            total_score: score,
            points_earned: None,
            submitted_at: None,
            graded_at: None,
            attempt_number: 1,
            teacher_feedback: None,
            time_taken: None,
        }),
    }
}

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

enum MockError {
    Core(CoreError),
    Injected(u16),
}

impl From<CoreError> for MockError {
    fn from(e: CoreError) -> Self {
        Self::Core(e)
    }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            MockError::Core(e) => {
                let message = e.to_string();
                match e {
                    CoreError::InvalidTransition { from, .. } => (
                        StatusCode::CONFLICT,
                        json!({"error": message, "code": "INVALID_TRANSITION", "current_status": from}),
                    ),
                    CoreError::Validation(_) => (
                        StatusCode::BAD_REQUEST,
                        json!({"error": message, "code": "VALIDATION_ERROR"}),
                    ),
                    CoreError::NotFound { .. } => (
                        StatusCode::NOT_FOUND,
                        json!({"error": message, "code": "NOT_FOUND"}),
                    ),
                }
            }
            MockError::Injected(code) => (
                StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                json!({"error": "injected failure", "code": "INTERNAL_ERROR"}),
            ),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Record the request and consume any injected failure. Returns the delay to
/// apply.
fn record_request(
    mock: &SharedMock,
    headers: &HeaderMap,
    transition: bool,
) -> Result<Option<Duration>, MockError> {
    let mut state = mock.lock().unwrap();
    if transition {
        state.transition_calls += 1;
    } else {
        state.list_calls += 1;
    }
    state.last_request_id = header(headers, "x-request-id");
    state.last_authorization = header(headers, "authorization");
    if let Some(code) = state.fail_next.take() {
        return Err(MockError::Injected(code));
    }
    Ok(if transition { state.delay } else { None })
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn gate(mock: &SharedMock, headers: &HeaderMap, transition: bool) -> Result<(), MockError> {
    if let Some(delay) = record_request(mock, headers, transition)? {
        tokio::time::sleep(delay).await;
    }
    Ok(())
}

fn with_task(
    mock: &SharedMock,
    id: DbId,
    apply: impl FnOnce(&mut DailyTask) -> Result<(), CoreError>,
) -> Result<Json<DailyTask>, MockError> {
    let mut state = mock.lock().unwrap();
    let task = state
        .tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or(CoreError::NotFound { entity: "task", id })?;
    apply(task)?;
    Ok(Json(task.clone()))
}

#[derive(Deserialize)]
struct TasksQuery {
    assigned_to: UserId,
}

async fn list_tasks(
    State(mock): State<SharedMock>,
    headers: HeaderMap,
    Query(q): Query<TasksQuery>,
) -> Result<Json<Vec<DailyTask>>, MockError> {
    gate(&mock, &headers, false).await?;
    Ok(Json(snapshot(&mock, |s| {
        s.tasks
            .iter()
            .filter(|t| t.assigned_to == q.assigned_to)
            .cloned()
            .collect()
    })))
}

async fn start_task(
    State(mock): State<SharedMock>,
    Path(id): Path<DbId>,
    headers: HeaderMap,
) -> Result<Json<DailyTask>, MockError> {
    gate(&mock, &headers, true).await?;
    with_task(&mock, id, |t| t.start(Utc::now()))
}

#[derive(Deserialize)]
struct DoneBody {
    notes: Option<String>,
}

async fn mark_task_done(
    State(mock): State<SharedMock>,
    Path(id): Path<DbId>,
    headers: HeaderMap,
    Json(body): Json<DoneBody>,
) -> Result<Json<DailyTask>, MockError> {
    gate(&mock, &headers, true).await?;
    with_task(&mock, id, |t| t.mark_done(body.notes, Utc::now()))
}

#[derive(Deserialize)]
struct RateBody {
    rating: i32,
    feedback: Option<String>,
}

async fn rate_task(
    State(mock): State<SharedMock>,
    Path(id): Path<DbId>,
    headers: HeaderMap,
    Json(body): Json<RateBody>,
) -> Result<Json<DailyTask>, MockError> {
    gate(&mock, &headers, true).await?;
    with_task(&mock, id, |t| {
        t.rate(body.rating, body.feedback, REVIEWER, Utc::now())
    })
}

#[derive(Deserialize)]
struct HomeworkQuery {
    student_id: Option<DbId>,
    subject: Option<String>,
    class_id: Option<DbId>,
    status: Option<String>,
}

async fn list_homework(
    State(mock): State<SharedMock>,
    headers: HeaderMap,
    Query(q): Query<HomeworkQuery>,
) -> Result<Json<Vec<HomeworkRecord>>, MockError> {
    gate(&mock, &headers, false).await?;
    Ok(Json(snapshot(&mock, |s| {
        s.homework
            .iter()
            .filter(|r| {
                q.student_id.map_or(true, |sid| {
                    r.submission.as_ref().map_or(true, |sub| sub.student_id == sid)
                })
            })
            .filter(|r| q.subject.as_deref().map_or(true, |s| r.assignment.subject == s))
            .filter(|r| q.class_id.map_or(true, |c| r.assignment.class_id == Some(c)))
            .filter(|r| {
                q.status
                    .as_deref()
                    .map_or(true, |s| r.canonical_status().as_str() == s)
            })
            .cloned()
            .collect()
    })))
}

#[derive(Deserialize)]
struct FlagsQuery {
    student_id: DbId,
    status: Option<String>,
}

async fn list_flags(
    State(mock): State<SharedMock>,
    headers: HeaderMap,
    Query(q): Query<FlagsQuery>,
) -> Result<Json<Vec<AbsenceFlag>>, MockError> {
    gate(&mock, &headers, false).await?;
    Ok(Json(snapshot(&mock, |s| {
        s.flags
            .iter()
            .filter(|f| f.student_id == q.student_id)
            .filter(|f| q.status.as_deref() != Some("pending") || f.is_pending())
            .cloned()
            .collect()
    })))
}

#[derive(Deserialize)]
struct ClearBody {
    clearance_reason: Option<String>,
    clearance_notes: Option<String>,
}

async fn clear_flag(
    State(mock): State<SharedMock>,
    Path(id): Path<DbId>,
    headers: HeaderMap,
    Json(body): Json<ClearBody>,
) -> Result<Json<AbsenceFlag>, MockError> {
    gate(&mock, &headers, true).await?;
    let mut state = mock.lock().unwrap();
    let flag = state
        .flags
        .iter_mut()
        .find(|f| f.id == id)
        .ok_or(CoreError::NotFound {
            entity: "absence flag",
            id,
        })?;
    flag.clear(
        body.clearance_reason.as_deref(),
        body.clearance_notes,
        STAFF,
        Utc::now(),
    )?;
    Ok(Json(flag.clone()))
}
