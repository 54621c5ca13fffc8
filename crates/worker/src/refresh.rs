//! Periodic dashboard refresh.
//!
//! Loads the student's task, homework and attendance boards, then refreshes
//! them on a fixed interval and logs the recomputed aggregates until the
//! shutdown future resolves. A failing board is logged and retried on the
//! next tick while the other boards keep refreshing. The initial load is
//! retried the same way.

use std::future::Future;

use chrono::Utc;
use serde::Serialize;

use schooldesk_client::api::{HomeworkFilter, SchoolApi};
use schooldesk_client::boards::{AttendanceBoard, HomeworkBoard, TaskBoard};
use schooldesk_client::error::ClientResult;
use schooldesk_core::attendance::FlagSummary;
use schooldesk_core::homework::HomeworkSummary;
use schooldesk_core::localize::localize;
use schooldesk_core::overdue::DueState;
use schooldesk_core::progress::ProgressSummary;
use schooldesk_core::task::TaskStats;
use schooldesk_core::types::{DbId, Timestamp};

use crate::config::WorkerConfig;

/// The three boards behind one student's dashboard.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub tasks: TaskBoard,
    pub homework: HomeworkBoard,
    pub attendance: AttendanceBoard,
}

/// One line on the due-date warning list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueWarning {
    pub homework_id: DbId,
    pub title: String,
    pub state: DueState,
}

/// Aggregates logged after each refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub tasks: TaskStats,
    pub homework: HomeworkSummary,
    pub scores: ProgressSummary,
    pub flags: FlagSummary,
    pub due_warnings: Vec<DueWarning>,
}

impl Dashboard {
    pub async fn load(api: &SchoolApi, student_id: DbId) -> ClientResult<Self> {
        Ok(Self {
            tasks: TaskBoard::load(api, student_id).await?,
            homework: HomeworkBoard::load(api, HomeworkFilter::for_student(student_id)).await?,
            attendance: AttendanceBoard::load(api, student_id).await?,
        })
    }

    /// Refresh every board. Returns how many failed.
    pub async fn refresh(&mut self, api: &SchoolApi) -> usize {
        let results = [
            ("tasks", self.tasks.refresh(api).await),
            ("homework", self.homework.refresh(api).await),
            ("attendance", self.attendance.refresh(api).await),
        ];
        let mut failures = 0;
        for (board, result) in results {
            if let Err(e) = result {
                failures += 1;
                tracing::warn!(board, retryable = e.is_retryable(), error = %e, "Board refresh failed");
            }
        }
        failures
    }

    pub fn report(&self, now: Timestamp, locale: &str) -> DashboardReport {
        let due_warnings = self
            .homework
            .due_warnings(now)
            .into_iter()
            .map(|(record, state)| DueWarning {
                homework_id: record.assignment.id,
                title: localize(record, locale).to_string(),
                state,
            })
            .collect();

        DashboardReport {
            tasks: self.tasks.stats(now),
            homework: self.homework.summary(),
            scores: self.homework.scores().overall,
            flags: self.attendance.summary(),
            due_warnings,
        }
    }
}

fn log_report(student_id: DbId, report: &DashboardReport) {
    tracing::info!(
        student_id,
        tasks_total = report.tasks.total,
        tasks_overdue = report.tasks.overdue,
        task_completion = report.tasks.completion.percentage,
        homework_pending = report.homework.pending,
        homework_completed = report.homework.completed,
        homework_overdue = report.homework.overdue,
        score_percentage = report.scores.percentage,
        pending_flags = report.flags.pending_count,
        "Dashboard refreshed",
    );
    for warning in &report.due_warnings {
        tracing::info!(
            homework_id = warning.homework_id,
            title = %warning.title,
            state = ?warning.state,
            "Homework due",
        );
    }
}

/// Run the refresh loop until `shutdown` resolves.
///
/// A failed initial load is logged and retried on each tick, so the worker
/// keeps running while the API is unreachable.
pub async fn run<S>(api: &SchoolApi, config: &WorkerConfig, shutdown: S) -> anyhow::Result<()>
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(config.refresh_interval);

    let mut dashboard = loop {
        tokio::select! {
            _ = ticker.tick() => {
                match Dashboard::load(api, config.student_id).await {
                    Ok(dashboard) => break dashboard,
                    Err(e) => {
                        tracing::warn!(
                            retryable = e.is_retryable(),
                            error = %e,
                            "Initial dashboard load failed, retrying",
                        );
                    }
                }
            }
            () = &mut shutdown => {
                tracing::info!("Shutdown requested before the dashboard loaded");
                return Ok(());
            }
        }
    };
    log_report(config.student_id, &dashboard.report(Utc::now(), &config.locale));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if dashboard.refresh(api).await == 0 {
                    log_report(config.student_id, &dashboard.report(Utc::now(), &config.locale));
                }
            }
            () = &mut shutdown => {
                tracing::info!("Shutdown requested, stopping refresh loop");
                return Ok(());
            }
        }
    }
}
