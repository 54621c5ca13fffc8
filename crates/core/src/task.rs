//! Daily task lifecycle.
//!
//! A task moves strictly forward through
//! `PENDING -> IN_PROGRESS -> DONE -> COMPLETE`. The assignee performs the
//! first two transitions; a reviewer closes the task by rating it. Steps can
//! not be skipped or repeated: re-running a transition fails instead of
//! silently succeeding, so `started_at` and `completed_at` keep the instant of
//! the first (and only) transition.
//!
//! Every transition validates first and mutates second, so a failed call
//! leaves the task untouched.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::localize::{Localized, Translations};
use crate::overdue::{self, DueState};
use crate::progress::ProgressSummary;
use crate::status::{define_vocabulary, TaskStatus};
use crate::types::{DbId, Timestamp, UserId};

/// Lowest accepted rating.
pub const MIN_RATING: i32 = 1;

/// Highest accepted rating.
pub const MAX_RATING: i32 = 5;

define_vocabulary! {
    /// Task priority. Ordered `LOW < MEDIUM < HIGH < URGENT`.
    TaskPriority (default = Medium) {
        Low => "LOW",
        Medium => "MEDIUM" | "normal",
        High => "HIGH",
        Urgent => "URGENT" | "critical",
    }
}

/// A daily task as exchanged with the school API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTask {
    pub id: DbId,
    pub title: String,
    #[serde(default)]
    pub title_translations: Translations,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<Timestamp>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub started_at: Option<Timestamp>,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
    #[serde(default)]
    pub reviewed_at: Option<Timestamp>,
    pub assigned_to: UserId,
    pub assigned_by: UserId,
    #[serde(default)]
    pub user_notes: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub rating_feedback: Option<String>,
    #[serde(default)]
    pub rated_by: Option<UserId>,
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// The three task transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskAction {
    Start,
    MarkDone,
    Rate,
}

impl TaskAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::MarkDone => "mark_done",
            Self::Rate => "rate",
        }
    }

    /// The only status this action may be applied from.
    pub fn required_status(self) -> TaskStatus {
        match self {
            Self::Start => TaskStatus::Pending,
            Self::MarkDone => TaskStatus::InProgress,
            Self::Rate => TaskStatus::Done,
        }
    }

    /// The status a successful application leads to.
    pub fn target_status(self) -> TaskStatus {
        match self {
            Self::Start => TaskStatus::InProgress,
            Self::MarkDone => TaskStatus::Done,
            Self::Rate => TaskStatus::Complete,
        }
    }
}

/// Resolve the status reached by applying `action` from `from`.
pub fn next_status(from: TaskStatus, action: TaskAction) -> Result<TaskStatus, CoreError> {
    if from == action.required_status() {
        Ok(action.target_status())
    } else {
        Err(CoreError::InvalidTransition {
            entity: "task",
            from: from.as_str().to_string(),
            action: action.as_str(),
        })
    }
}

/// Validate a reviewer rating, returning it in storage form.
pub fn validate_rating(rating: i32) -> Result<u8, CoreError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(rating as u8)
    } else {
        Err(CoreError::Validation(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING} (got {rating})"
        )))
    }
}

impl DailyTask {
    /// Check that `action` is legal from the current status without applying it.
    pub fn ensure_can(&self, action: TaskAction) -> Result<(), CoreError> {
        next_status(self.status, action).map(|_| ())
    }

    /// PENDING -> IN_PROGRESS.
    pub fn start(&mut self, now: Timestamp) -> Result<(), CoreError> {
        self.status = next_status(self.status, TaskAction::Start)?;
        self.started_at = Some(now);
        Ok(())
    }

    /// IN_PROGRESS -> DONE. `notes` replaces `user_notes` when given.
    pub fn mark_done(&mut self, notes: Option<String>, now: Timestamp) -> Result<(), CoreError> {
        self.status = next_status(self.status, TaskAction::MarkDone)?;
        self.completed_at = Some(now);
        if let Some(notes) = notes {
            self.user_notes = Some(notes);
        }
        Ok(())
    }

    /// DONE -> COMPLETE, attaching the reviewer's rating.
    pub fn rate(
        &mut self,
        rating: i32,
        feedback: Option<String>,
        reviewer: UserId,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        let next = next_status(self.status, TaskAction::Rate)?;
        let rating = validate_rating(rating)?;

        self.status = next;
        self.rating = Some(rating);
        self.rating_feedback = feedback;
        self.rated_by = Some(reviewer);
        self.reviewed_at = Some(now);
        Ok(())
    }

    /// Date-derived overdue warning. DONE and COMPLETE tasks are never overdue.
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        overdue::is_overdue(self.due_date, now, self.status.is_finished())
    }

    pub fn due_state(&self, now: Timestamp) -> DueState {
        overdue::classify_default(self.due_date, now, self.status.is_finished())
    }

    /// Verify the timestamp and rating invariants of a record received from
    /// the API.
    pub fn check_invariants(&self) -> Result<(), CoreError> {
        let started = !matches!(self.status, TaskStatus::Pending);
        if self.started_at.is_some() != started {
            return Err(self.invariant_error("started_at"));
        }
        if self.completed_at.is_some() != self.status.is_finished() {
            return Err(self.invariant_error("completed_at"));
        }
        let complete = self.status == TaskStatus::Complete;
        if self.rating.is_some() != complete {
            return Err(self.invariant_error("rating"));
        }
        if let Some(rating) = self.rating {
            validate_rating(i32::from(rating))?;
        }
        Ok(())
    }

    fn invariant_error(&self, field: &str) -> CoreError {
        CoreError::Validation(format!(
            "Task {} has inconsistent {field} for status {}",
            self.id, self.status
        ))
    }
}

impl Localized for DailyTask {
    fn default_title(&self) -> &str {
        &self.title
    }

    fn title_translations(&self) -> &Translations {
        &self.title_translations
    }
}

// ---------------------------------------------------------------------------
// Ordering and stats
// ---------------------------------------------------------------------------

/// Default display order: highest priority first, then earliest due date
/// (tasks without a due date last), then id.
pub fn display_order(a: &DailyTask, b: &DailyTask) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_for_display(tasks: &mut [DailyTask]) {
    tasks.sort_by(display_order);
}

/// Dashboard counters for a set of tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub done: usize,
    pub complete: usize,
    pub overdue: usize,
    /// Share of tasks the assignee has finished (DONE or COMPLETE).
    pub completion: ProgressSummary,
    /// Mean rating across COMPLETE tasks, if any were rated.
    pub average_rating: Option<f64>,
}

impl TaskStats {
    pub fn collect(tasks: &[DailyTask], now: Timestamp) -> Self {
        let mut stats = Self {
            total: tasks.len(),
            ..Self::default()
        };
        let mut rating_sum = 0u32;
        let mut rated = 0u32;

        for task in tasks {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Done => stats.done += 1,
                TaskStatus::Complete => stats.complete += 1,
            }
            if task.is_overdue(now) {
                stats.overdue += 1;
            }
            if let (TaskStatus::Complete, Some(rating)) = (task.status, task.rating) {
                rating_sum += u32::from(rating);
                rated += 1;
            }
        }

        stats.completion = ProgressSummary::from_counts(stats.done + stats.complete, stats.total);
        if rated > 0 {
            stats.average_rating = Some(f64::from(rating_sum) / f64::from(rated));
        }
        stats
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
