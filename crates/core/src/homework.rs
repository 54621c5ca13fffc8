//! Homework submission status and dashboard aggregation.
//!
//! The API delivers homework as composite records: an assignment with the
//! requesting student's current submission (if any) attached. Submission
//! statuses are raw strings; they are normalized through
//! [`crate::status::SubmissionStatus`] before anything is counted.
//!
//! Note that `overdue` here is the status the API stores on the submission.
//! The date-derived warning is [`HomeworkRecord::due_state`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::localize::{Localized, Translations};
use crate::overdue::{self, DueState};
use crate::progress::{ProgressSummary, ScorePair};
use crate::status::{HomeworkStatus, SubmissionStatus};
use crate::types::{DbId, Timestamp};

/// Bucket used for assignments that carry no subject.
pub const UNCATEGORIZED_SUBJECT: &str = "uncategorized";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeworkAssignment {
    pub id: DbId,
    pub title: String,
    #[serde(default)]
    pub title_translations: Translations,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub grade_id: Option<DbId>,
    #[serde(default)]
    pub class_id: Option<DbId>,
    #[serde(default)]
    pub due_date: Option<Timestamp>,
    #[serde(default)]
    pub total_points: Option<f64>,
    #[serde(default)]
    pub allow_late_submissions: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSubmission {
    pub id: DbId,
    pub student_id: DbId,
    /// Raw status string as sent by the API.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub total_score: Option<f64>,
    #[serde(default)]
    pub points_earned: Option<f64>,
    #[serde(default)]
    pub submitted_at: Option<Timestamp>,
    #[serde(default)]
    pub graded_at: Option<Timestamp>,
    #[serde(default = "first_attempt")]
    pub attempt_number: u32,
    #[serde(default)]
    pub teacher_feedback: Option<String>,
    /// Seconds spent on the attempt.
    #[serde(default)]
    pub time_taken: Option<i64>,
}

fn first_attempt() -> u32 {
    1
}

impl StudentSubmission {
    pub fn status(&self) -> SubmissionStatus {
        SubmissionStatus::from_raw(&self.status)
    }
}

/// An assignment together with the student's current submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeworkRecord {
    #[serde(flatten)]
    pub assignment: HomeworkAssignment,
    #[serde(default)]
    pub submission: Option<StudentSubmission>,
}

impl HomeworkRecord {
    /// Fine-grained status; a record with no submission is `pending`.
    pub fn submission_status(&self) -> SubmissionStatus {
        self.submission
            .as_ref()
            .map(StudentSubmission::status)
            .unwrap_or(SubmissionStatus::Pending)
    }

    pub fn canonical_status(&self) -> HomeworkStatus {
        self.submission_status().canonical()
    }

    /// Date-derived warning for the assignment. Handed-in work is on time.
    pub fn due_state(&self, now: Timestamp) -> DueState {
        overdue::classify_default(
            self.assignment.due_date,
            now,
            self.submission_status().is_completion(),
        )
    }

    /// Score contribution, or `None` when the record must not count.
    ///
    /// Only handed-in work with a positive point total and a finite score
    /// contributes.
    fn score_pair(&self) -> Option<ScorePair> {
        let submission = self.submission.as_ref()?;
        if !submission.status().is_completion() {
            return None;
        }
        let possible = self.assignment.total_points.filter(|p| p.is_finite() && *p > 0.0)?;
        let earned = submission.total_score.filter(|s| s.is_finite())?;
        Some(ScorePair::new(earned, possible))
    }

    fn subject_key(&self) -> &str {
        let subject = self.assignment.subject.trim();
        if subject.is_empty() {
            UNCATEGORIZED_SUBJECT
        } else {
            subject
        }
    }
}

impl Localized for HomeworkRecord {
    fn default_title(&self) -> &str {
        &self.assignment.title
    }

    fn title_translations(&self) -> &Translations {
        &self.assignment.title_translations
    }
}

/// Pick `student_id`'s current submission: highest attempt number, then
/// latest `submitted_at`. Other students' submissions are ignored.
pub fn current_submission(
    submissions: &[StudentSubmission],
    student_id: DbId,
) -> Option<&StudentSubmission> {
    submissions
        .iter()
        .filter(|s| s.student_id == student_id)
        .max_by_key(|s| (s.attempt_number, s.submitted_at))
}

/// Whether the assignment still accepts a submission at `now`.
pub fn accepts_submission(assignment: &HomeworkAssignment, now: Timestamp) -> bool {
    assignment.allow_late_submissions || !overdue::is_overdue(assignment.due_date, now, false)
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Dashboard counters. Every record lands in exactly one of `pending`,
/// `completed` or `overdue`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeworkSummary {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub overdue: usize,
}

pub fn summarize(records: &[HomeworkRecord]) -> HomeworkSummary {
    let mut summary = HomeworkSummary {
        total: records.len(),
        ..HomeworkSummary::default()
    };
    for record in records {
        match record.canonical_status() {
            HomeworkStatus::Completed => summary.completed += 1,
            HomeworkStatus::Overdue => summary.overdue += 1,
            HomeworkStatus::Pending | HomeworkStatus::InProgress => summary.pending += 1,
        }
    }
    summary
}

/// Score roll-up overall and per subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub overall: ProgressSummary,
    pub by_subject: BTreeMap<String, ProgressSummary>,
}

pub fn aggregate_scores(records: &[HomeworkRecord]) -> ScoreReport {
    let mut report = ScoreReport::default();
    for record in records {
        let Some(pair) = record.score_pair() else {
            continue;
        };
        report.overall.add(pair);
        report
            .by_subject
            .entry(record.subject_key().to_string())
            .or_default()
            .add(pair);
    }
    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
