//! REST client for the school API.
//!
//! Wraps the task, homework and attendance endpoints using [`reqwest`].
//! State-changing calls go through [`SchoolApi::transition`], which holds an
//! in-flight ticket for the duration of the request and maps error bodies
//! onto [`ClientError`].

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use schooldesk_core::attendance::{AbsenceFlag, ClearanceReason};
use schooldesk_core::homework::HomeworkRecord;
use schooldesk_core::status::HomeworkStatus;
use schooldesk_core::task::{validate_rating, DailyTask, TaskAction};
use schooldesk_core::types::{DbId, UserId};

use crate::config::ClientConfig;
use crate::error::{classify_error_response, ClientResult};
use crate::in_flight::{InFlightRegistry, TransitionKey};

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP client for one school API deployment.
#[derive(Debug, Clone)]
pub struct SchoolApi {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    in_flight: InFlightRegistry,
}

/// Query filters for `GET /homework`. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HomeworkFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<HomeworkStatus>,
}

impl HomeworkFilter {
    pub fn for_student(student_id: DbId) -> Self {
        Self {
            student_id: Some(student_id),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct AssignedQuery {
    assigned_to: UserId,
}

#[derive(Debug, Serialize)]
struct FlagQuery {
    student_id: DbId,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct DoneRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

#[derive(Debug, Serialize)]
struct RateRequest {
    rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    feedback: Option<String>,
}

#[derive(Debug, Serialize)]
struct ClearRequest {
    clearance_reason: ClearanceReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    clearance_notes: Option<String>,
}

impl SchoolApi {
    /// Create a client with its own connection pool and the configured
    /// request timeout.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create a client reusing an existing [`reqwest::Client`]. The client's
    /// own timeout settings apply.
    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_token: config.api_token.clone(),
            in_flight: InFlightRegistry::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Transitions currently awaiting a response.
    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.in_flight
    }

    pub fn is_in_flight(&self, key: &TransitionKey) -> bool {
        self.in_flight.is_in_flight(key)
    }

    // ---- tasks ----

    /// `GET /tasks?assigned_to={user}`.
    pub async fn list_tasks(&self, assigned_to: UserId) -> ClientResult<Vec<DailyTask>> {
        self.fetch("/tasks", &AssignedQuery { assigned_to }).await
    }

    /// `POST /tasks/{id}/start`.
    pub async fn start_task(&self, id: DbId) -> ClientResult<DailyTask> {
        self.transition(
            TransitionKey::task(id, TaskAction::Start),
            &format!("/tasks/{id}/start"),
            None::<&()>,
        )
        .await
    }

    /// `POST /tasks/{id}/done`.
    pub async fn mark_task_done(&self, id: DbId, notes: Option<String>) -> ClientResult<DailyTask> {
        self.transition(
            TransitionKey::task(id, TaskAction::MarkDone),
            &format!("/tasks/{id}/done"),
            Some(&DoneRequest { notes }),
        )
        .await
    }

    /// `POST /tasks/{id}/rate`. Out-of-range ratings fail before any request
    /// is made.
    pub async fn rate_task(
        &self,
        id: DbId,
        rating: i32,
        feedback: Option<String>,
    ) -> ClientResult<DailyTask> {
        let rating = validate_rating(rating)?;
        self.transition(
            TransitionKey::task(id, TaskAction::Rate),
            &format!("/tasks/{id}/rate"),
            Some(&RateRequest { rating, feedback }),
        )
        .await
    }

    // ---- homework ----

    /// `GET /homework?{filter}`.
    pub async fn list_homework(&self, filter: &HomeworkFilter) -> ClientResult<Vec<HomeworkRecord>> {
        self.fetch("/homework", filter).await
    }

    // ---- attendance ----

    /// `GET /attendance/flags?student_id={id}&status=pending`.
    pub async fn list_pending_flags(&self, student_id: DbId) -> ClientResult<Vec<AbsenceFlag>> {
        self.fetch(
            "/attendance/flags",
            &FlagQuery {
                student_id,
                status: "pending",
            },
        )
        .await
    }

    /// `POST /attendance/flags/{id}/clear`. A missing or unknown reason fails
    /// before any request is made.
    pub async fn clear_flag(
        &self,
        id: DbId,
        reason: Option<&str>,
        notes: Option<String>,
    ) -> ClientResult<AbsenceFlag> {
        let clearance_reason = ClearanceReason::parse(reason)?;
        self.transition(
            TransitionKey::clear_flag(id),
            &format!("/attendance/flags/{id}/clear"),
            Some(&ClearRequest {
                clearance_reason,
                clearance_notes: notes.filter(|n| !n.trim().is_empty()),
            }),
        )
        .await
    }

    // ---- private helpers ----

    fn request(&self, method: Method, path: &str, request_id: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header(REQUEST_ID_HEADER, request_id);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn fetch<Q, T>(&self, path: &str, query: &Q) -> ClientResult<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request_id = Uuid::new_v4().to_string();
        tracing::debug!(path, request_id = %request_id, "Sending school API request");

        let response = self
            .request(Method::GET, path, &request_id)
            .query(query)
            .send()
            .await
            .inspect_err(|e| {
                tracing::warn!(path, request_id = %request_id, error = %e, "School API request failed");
            })?;

        Self::parse_response(response, None).await.inspect_err(|e| {
            tracing::warn!(path, request_id = %request_id, error = %e, "School API request rejected");
        })
    }

    /// Send one state-changing request while holding its in-flight ticket.
    ///
    /// A duplicate of an outstanding transition fails with
    /// [`ClientError::InFlight`](crate::error::ClientError::InFlight) and
    /// sends nothing. The ticket is released when this future completes or is
    /// dropped.
    async fn transition<B, T>(&self, key: TransitionKey, path: &str, body: Option<&B>) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let _ticket = self.in_flight.try_begin(key)?;
        let request_id = Uuid::new_v4().to_string();

        tracing::debug!(
            entity = key.entity,
            id = key.id,
            action = key.action,
            request_id = %request_id,
            "Sending transition",
        );

        let mut builder = self.request(Method::POST, path, &request_id);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let result = match builder.send().await {
            Ok(response) => Self::parse_response(response, Some(&key)).await,
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(_) => tracing::info!(
                entity = key.entity,
                id = key.id,
                action = key.action,
                request_id = %request_id,
                "Transition confirmed",
            ),
            Err(e) => tracing::warn!(
                entity = key.entity,
                id = key.id,
                action = key.action,
                request_id = %request_id,
                retryable = e.is_retryable(),
                error = %e,
                "Transition rejected",
            ),
        }
        result
    }

    /// Ensure the response has a success status code, mapping the error
    /// body otherwise.
    async fn ensure_success(
        response: reqwest::Response,
        context: Option<&TransitionKey>,
    ) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(classify_error_response(status.as_u16(), body, context));
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
        context: Option<&TransitionKey>,
    ) -> ClientResult<T> {
        let response = Self::ensure_success(response, context).await?;
        Ok(response.json::<T>().await?)
    }
}
