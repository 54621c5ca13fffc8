//! Dashboard state backed by the school API.
//!
//! A board holds the last server-confirmed snapshot of one dashboard panel
//! and recomputes its aggregates from that snapshot. Transitions are checked
//! against the snapshot before anything is sent, and a record is replaced
//! only with the server's response; nothing is updated optimistically.

use schooldesk_core::attendance::{pending_flags, AbsenceFlag, ClearanceReason, FlagSummary};
use schooldesk_core::error::CoreError;
use schooldesk_core::homework::{aggregate_scores, summarize, HomeworkRecord, HomeworkSummary, ScoreReport};
use schooldesk_core::overdue::DueState;
use schooldesk_core::task::{sort_for_display, DailyTask, TaskAction, TaskStats};
use schooldesk_core::types::{DbId, Timestamp, UserId};

use crate::api::{HomeworkFilter, SchoolApi};
use crate::error::ClientResult;
use crate::in_flight::TransitionKey;

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// One user's daily tasks in display order.
#[derive(Debug, Clone)]
pub struct TaskBoard {
    assignee: UserId,
    tasks: Vec<DailyTask>,
}

impl TaskBoard {
    pub fn new(assignee: UserId, mut tasks: Vec<DailyTask>) -> Self {
        sort_for_display(&mut tasks);
        Self { assignee, tasks }
    }

    pub async fn load(api: &SchoolApi, assignee: UserId) -> ClientResult<Self> {
        let tasks = api.list_tasks(assignee).await?;
        Ok(Self::new(assignee, tasks))
    }

    pub async fn refresh(&mut self, api: &SchoolApi) -> ClientResult<()> {
        let mut tasks = api.list_tasks(self.assignee).await?;
        sort_for_display(&mut tasks);
        self.tasks = tasks;
        Ok(())
    }

    pub fn assignee(&self) -> UserId {
        self.assignee
    }

    pub fn tasks(&self) -> &[DailyTask] {
        &self.tasks
    }

    pub fn get(&self, id: DbId) -> Option<&DailyTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn stats(&self, now: Timestamp) -> TaskStats {
        TaskStats::collect(&self.tasks, now)
    }

    /// Whether the action button for `id` should be enabled.
    pub fn can(&self, api: &SchoolApi, id: DbId, action: TaskAction) -> bool {
        self.precheck(id, action).is_ok() && !api.is_in_flight(&TransitionKey::task(id, action))
    }

    pub async fn start(&mut self, api: &SchoolApi, id: DbId) -> ClientResult<DailyTask> {
        self.precheck(id, TaskAction::Start)?;
        let updated = api.start_task(id).await?;
        Ok(self.replace(updated))
    }

    pub async fn mark_done(
        &mut self,
        api: &SchoolApi,
        id: DbId,
        notes: Option<String>,
    ) -> ClientResult<DailyTask> {
        self.precheck(id, TaskAction::MarkDone)?;
        let updated = api.mark_task_done(id, notes).await?;
        Ok(self.replace(updated))
    }

    pub async fn rate(
        &mut self,
        api: &SchoolApi,
        id: DbId,
        rating: i32,
        feedback: Option<String>,
    ) -> ClientResult<DailyTask> {
        self.precheck(id, TaskAction::Rate)?;
        let updated = api.rate_task(id, rating, feedback).await?;
        Ok(self.replace(updated))
    }

    fn precheck(&self, id: DbId, action: TaskAction) -> Result<(), CoreError> {
        self.get(id)
            .ok_or(CoreError::NotFound { entity: "task", id })?
            .ensure_can(action)
    }

    fn replace(&mut self, updated: DailyTask) -> DailyTask {
        if let Err(e) = updated.check_invariants() {
            tracing::warn!(task_id = updated.id, error = %e, "Server returned inconsistent task");
        }
        match self.tasks.iter_mut().find(|t| t.id == updated.id) {
            Some(slot) => *slot = updated.clone(),
            None => self.tasks.push(updated.clone()),
        }
        sort_for_display(&mut self.tasks);
        updated
    }
}

// ---------------------------------------------------------------------------
// Homework
// ---------------------------------------------------------------------------

/// Homework records for one filter, with their aggregates.
#[derive(Debug, Clone)]
pub struct HomeworkBoard {
    filter: HomeworkFilter,
    records: Vec<HomeworkRecord>,
    summary: HomeworkSummary,
    scores: ScoreReport,
}

impl HomeworkBoard {
    pub fn new(filter: HomeworkFilter, records: Vec<HomeworkRecord>) -> Self {
        let summary = summarize(&records);
        let scores = aggregate_scores(&records);
        Self {
            filter,
            records,
            summary,
            scores,
        }
    }

    pub async fn load(api: &SchoolApi, filter: HomeworkFilter) -> ClientResult<Self> {
        let records = api.list_homework(&filter).await?;
        Ok(Self::new(filter, records))
    }

    /// Re-fetch and recompute. On failure the previous snapshot is kept.
    pub async fn refresh(&mut self, api: &SchoolApi) -> ClientResult<()> {
        let records = api.list_homework(&self.filter).await?;
        *self = Self::new(self.filter.clone(), records);
        Ok(())
    }

    pub fn filter(&self) -> &HomeworkFilter {
        &self.filter
    }

    pub fn records(&self) -> &[HomeworkRecord] {
        &self.records
    }

    pub fn summary(&self) -> HomeworkSummary {
        self.summary
    }

    pub fn scores(&self) -> &ScoreReport {
        &self.scores
    }

    /// Records that are due soon or past due at `now`, most urgent first.
    pub fn due_warnings(&self, now: Timestamp) -> Vec<(&HomeworkRecord, DueState)> {
        let mut warnings: Vec<(&HomeworkRecord, DueState)> = self
            .records
            .iter()
            .map(|r| (r, r.due_state(now)))
            .filter(|(_, state)| *state != DueState::OnTime)
            .collect();
        warnings.sort_by_key(|(r, state)| (*state != DueState::Overdue, r.assignment.due_date));
        warnings
    }
}

// ---------------------------------------------------------------------------
// Attendance flags
// ---------------------------------------------------------------------------

/// A student's absence flags and the open-flag summary.
#[derive(Debug, Clone)]
pub struct AttendanceBoard {
    student_id: DbId,
    flags: Vec<AbsenceFlag>,
    summary: FlagSummary,
}

impl AttendanceBoard {
    pub fn new(student_id: DbId, flags: Vec<AbsenceFlag>) -> Self {
        let summary = FlagSummary::for_student(&flags, student_id);
        Self {
            student_id,
            flags,
            summary,
        }
    }

    pub async fn load(api: &SchoolApi, student_id: DbId) -> ClientResult<Self> {
        let flags = api.list_pending_flags(student_id).await?;
        Ok(Self::new(student_id, flags))
    }

    pub async fn refresh(&mut self, api: &SchoolApi) -> ClientResult<()> {
        self.flags = api.list_pending_flags(self.student_id).await?;
        self.summary = FlagSummary::for_student(&self.flags, self.student_id);
        Ok(())
    }

    pub fn student_id(&self) -> DbId {
        self.student_id
    }

    pub fn flags(&self) -> &[AbsenceFlag] {
        &self.flags
    }

    /// Open flags, oldest first.
    pub fn pending(&self) -> Vec<&AbsenceFlag> {
        pending_flags(&self.flags, self.student_id)
    }

    pub fn summary(&self) -> FlagSummary {
        self.summary
    }

    /// Clear flag `id`. The flag must be pending on this board and the reason
    /// valid before the request is sent.
    pub async fn clear(
        &mut self,
        api: &SchoolApi,
        id: DbId,
        reason: Option<&str>,
        notes: Option<String>,
    ) -> ClientResult<AbsenceFlag> {
        self.flags
            .iter()
            .find(|f| f.id == id)
            .ok_or(CoreError::NotFound {
                entity: "absence flag",
                id,
            })?
            .ensure_pending()?;
        ClearanceReason::parse(reason)?;

        let updated = api.clear_flag(id, reason, notes).await?;
        if let Some(slot) = self.flags.iter_mut().find(|f| f.id == id) {
            *slot = updated.clone();
        }
        self.summary = FlagSummary::for_student(&self.flags, self.student_id);

        tracing::debug!(
            flag_id = id,
            pending_count = self.summary.pending_count,
            cleared_at = ?updated.cleared_at,
            "Absence flag cleared",
        );
        Ok(updated)
    }
}
