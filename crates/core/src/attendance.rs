//! Absence flags and attendance rates.
//!
//! An automated compliance process raises an absence flag when it detects a
//! suspicious pattern. Staff clear it exactly once, supplying a reason.
//! Clearing is one-way: a cleared flag can not be re-opened or cleared again.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::progress::ProgressSummary;
use crate::status::{status_key, AttendanceMark, FlagStatus};
use crate::types::{DbId, Timestamp, UserId};

/// Why a flag was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearanceReason {
    Medical,
    Family,
    ParentPermission,
    SchoolActivity,
    Other,
}

impl ClearanceReason {
    pub const ALL: &'static [ClearanceReason] = &[
        Self::Medical,
        Self::Family,
        Self::ParentPermission,
        Self::SchoolActivity,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Medical => "medical",
            Self::Family => "family",
            Self::ParentPermission => "parent_permission",
            Self::SchoolActivity => "school_activity",
            Self::Other => "other",
        }
    }

    /// Parse a reason submitted by a form. Case, dashes and spaces are
    /// folded like status values. Missing or unknown values fail.
    pub fn parse(raw: Option<&str>) -> Result<Self, CoreError> {
        let raw = raw.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Err(CoreError::Validation(
                "A clearance reason is required".to_string(),
            ));
        }
        let key = status_key(raw);
        Self::ALL
            .iter()
            .copied()
            .find(|reason| reason.as_str() == key)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|r| r.as_str()).collect();
                CoreError::Validation(format!(
                    "Invalid clearance reason '{raw}'. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

impl std::fmt::Display for ClearanceReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsenceFlag {
    pub id: DbId,
    pub student_id: DbId,
    #[serde(default)]
    pub subject_name: Option<String>,
    pub attendance_date: chrono::NaiveDate,
    pub created_at: Timestamp,
    #[serde(default)]
    pub status: FlagStatus,
    #[serde(default)]
    pub clearance_reason: Option<ClearanceReason>,
    #[serde(default)]
    pub clearance_notes: Option<String>,
    #[serde(default)]
    pub cleared_by: Option<UserId>,
    #[serde(default)]
    pub cleared_at: Option<Timestamp>,
}

impl AbsenceFlag {
    pub fn is_pending(&self) -> bool {
        self.status == FlagStatus::Pending
    }

    /// Check that the flag can still be cleared.
    pub fn ensure_pending(&self) -> Result<(), CoreError> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                entity: "absence flag",
                from: self.status.as_str().to_string(),
                action: "clear",
            })
        }
    }

    /// pending -> cleared.
    ///
    /// The state check runs before reason validation, so clearing an already
    /// cleared flag always reports `InvalidTransition`.
    pub fn clear(
        &mut self,
        reason: Option<&str>,
        notes: Option<String>,
        actor: UserId,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        self.ensure_pending()?;
        let reason = ClearanceReason::parse(reason)?;

        self.status = FlagStatus::Cleared;
        self.clearance_reason = Some(reason);
        self.clearance_notes = notes.filter(|n| !n.trim().is_empty());
        self.cleared_by = Some(actor);
        self.cleared_at = Some(now);
        Ok(())
    }
}

/// Open-flag counters for one student.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSummary {
    pub pending_count: usize,
    pub has_pending_flags: bool,
}

impl FlagSummary {
    pub fn for_student(flags: &[AbsenceFlag], student_id: DbId) -> Self {
        let pending_count = flags
            .iter()
            .filter(|f| f.student_id == student_id && f.is_pending())
            .count();
        Self {
            pending_count,
            has_pending_flags: pending_count > 0,
        }
    }
}

/// The student's open flags, oldest attendance date first.
pub fn pending_flags(flags: &[AbsenceFlag], student_id: DbId) -> Vec<&AbsenceFlag> {
    let mut pending: Vec<&AbsenceFlag> = flags
        .iter()
        .filter(|f| f.student_id == student_id && f.is_pending())
        .collect();
    pending.sort_by_key(|f| (f.attendance_date, f.created_at, f.id));
    pending
}

// ---------------------------------------------------------------------------
// Attendance rate
// ---------------------------------------------------------------------------

/// One day's attendance mark for a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: DbId,
    pub date: chrono::NaiveDate,
    #[serde(default)]
    pub status: AttendanceMark,
}

/// Share of marked days the student attended. Present and late count as
/// attended; absent and excused as missed; unmarked days are ignored.
pub fn attendance_rate(records: &[AttendanceRecord]) -> ProgressSummary {
    let mut attended = 0usize;
    let mut marked = 0usize;
    for record in records {
        match record.status {
            AttendanceMark::Present | AttendanceMark::Late => {
                attended += 1;
                marked += 1;
            }
            AttendanceMark::Absent | AttendanceMark::Excused => marked += 1,
            AttendanceMark::NotMarked => {}
        }
    }
    ProgressSummary::from_counts(attended, marked)
}
