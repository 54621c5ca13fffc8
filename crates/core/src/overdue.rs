//! Date-derived due-date warnings.
//!
//! Overdue here is a live check computed at read time from a due date and the
//! current instant. It is a pre-completion warning: an entity that is already
//! completed is never overdue, however late it was finished.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Default look-ahead window for [`DueState::DueSoon`].
pub const DEFAULT_DUE_SOON_WINDOW_HOURS: i64 = 24;

/// Where an entity stands relative to its due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueState {
    OnTime,
    DueSoon,
    Overdue,
}

/// `true` when `now` is strictly past `due` and the entity is not completed.
///
/// `due == now` is not overdue. A missing due date is never overdue.
pub fn is_overdue(due: Option<Timestamp>, now: Timestamp, completed: bool) -> bool {
    match due {
        Some(due) if !completed => now > due,
        _ => false,
    }
}

/// Signed time left until `due`. Negative once the due date has passed.
pub fn time_remaining(due: Timestamp, now: Timestamp) -> Duration {
    due - now
}

/// Classify an entity as on-time, due-soon or overdue.
///
/// `DueSoon` covers the `window` before the due date, inclusive of the due
/// instant itself.
pub fn classify(
    due: Option<Timestamp>,
    now: Timestamp,
    completed: bool,
    window: Duration,
) -> DueState {
    let Some(due_at) = due else {
        return DueState::OnTime;
    };
    if completed {
        return DueState::OnTime;
    }
    if is_overdue(due, now, completed) {
        return DueState::Overdue;
    }
    if time_remaining(due_at, now) <= window {
        DueState::DueSoon
    } else {
        DueState::OnTime
    }
}

/// [`classify`] with the default 24-hour window.
pub fn classify_default(due: Option<Timestamp>, now: Timestamp, completed: bool) -> DueState {
    classify(
        due,
        now,
        completed,
        Duration::hours(DEFAULT_DUE_SOON_WINDOW_HOURS),
    )
}
