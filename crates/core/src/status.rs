//! Canonical status vocabularies and the raw-status normalizer.
//!
//! The school API is inconsistent about status strings: different entity
//! families use different spellings, casing and synonyms for the same state.
//! Every family gets a small canonical enum here, together with an explicit
//! mapping table from raw values. Mapping is total: values that are not in
//! the table fall back to a documented per-family default instead of failing.

use serde::{Deserialize, Serialize};

/// Fold a raw status string into its lookup key: trimmed, lower-cased, with
/// `-` and spaces turned into `_`.
pub fn status_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Define a canonical vocabulary enum with a lenient raw-string mapping.
///
/// Each variant lists its canonical wire value followed by any raw aliases
/// (given in [`status_key`] form). Serialization writes the canonical value;
/// deserialization goes through `from_raw` and therefore never fails on an
/// unknown string.
macro_rules! define_vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident (default = $default:ident) {
            $( $(#[$vmeta:meta])* $variant:ident => $canonical:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Canonical wire value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $canonical ),+
                }
            }

            /// Map a raw status string onto this vocabulary.
            pub fn from_raw(raw: &str) -> Self {
                let key = $crate::status::status_key(raw);
                $(
                    if key == $crate::status::status_key($canonical) $( || key == $alias )* {
                        return Self::$variant;
                    }
                )+
                Self::$default
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
                Ok(Self::from_raw(&raw))
            }
        }
    };
}

pub(crate) use define_vocabulary;

// ---------------------------------------------------------------------------
// Per-family vocabularies
// ---------------------------------------------------------------------------

define_vocabulary! {
    /// Daily task lifecycle state. Upper-case on the wire.
    TaskStatus (default = Pending) {
        Pending => "PENDING" | "todo" | "assigned",
        InProgress => "IN_PROGRESS" | "started",
        Done => "DONE",
        Complete => "COMPLETE" | "completed" | "reviewed",
    }
}

impl TaskStatus {
    /// DONE and COMPLETE both mean the assignee has finished the work.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Complete)
    }
}

define_vocabulary! {
    /// Fine-grained homework submission state, as reported by the API.
    ///
    /// Kept distinct from [`HomeworkStatus`] so that badges can still tell
    /// "late" from "completed" after normalization.
    SubmissionStatus (default = Pending) {
        Pending => "pending" | "not_started" | "assigned",
        InProgress => "in_progress" | "started",
        Draft => "draft",
        Overdue => "overdue" | "missing",
        Completed => "completed" | "submitted",
        Late => "late" | "submitted_late",
        AutoGraded => "auto_graded",
        ManuallyGraded => "manually_graded" | "graded",
    }
}

impl SubmissionStatus {
    /// Whether the student has handed the work in (on time, late, or graded).
    pub fn is_completion(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Late | Self::AutoGraded | Self::ManuallyGraded
        )
    }

    /// Fold into the four-value canonical homework vocabulary.
    pub fn canonical(self) -> HomeworkStatus {
        match self {
            Self::Pending => HomeworkStatus::Pending,
            Self::InProgress | Self::Draft => HomeworkStatus::InProgress,
            Self::Overdue => HomeworkStatus::Overdue,
            Self::Completed | Self::Late | Self::AutoGraded | Self::ManuallyGraded => {
                HomeworkStatus::Completed
            }
        }
    }
}

/// Canonical homework status: always one of four values.
///
/// `Overdue` is the status the API stores on the submission. It is not the
/// date-derived warning computed by [`crate::overdue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum HomeworkStatus {
    Pending,
    InProgress,
    Completed,
    Overdue,
}

impl HomeworkStatus {
    pub const ALL: &'static [HomeworkStatus] =
        &[Self::Pending, Self::InProgress, Self::Completed, Self::Overdue];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
        }
    }

    /// Map a raw submission status onto the canonical vocabulary.
    pub fn from_raw(raw: &str) -> Self {
        SubmissionStatus::from_raw(raw).canonical()
    }
}

impl From<String> for HomeworkStatus {
    fn from(raw: String) -> Self {
        Self::from_raw(&raw)
    }
}

impl std::fmt::Display for HomeworkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

define_vocabulary! {
    /// Self-paced exercise availability.
    ExerciseStatus (default = Available) {
        Available => "available" | "not_started" | "open",
        InProgress => "in_progress" | "started",
        Completed => "completed" | "submitted" | "passed",
        Locked => "locked" | "unavailable",
    }
}

define_vocabulary! {
    /// Daily attendance mark for one student.
    AttendanceMark (default = NotMarked) {
        Present => "present",
        Absent => "absent" | "unexcused",
        Late => "late" | "tardy",
        Excused => "excused",
        NotMarked => "not_marked" | "unmarked",
    }
}

define_vocabulary! {
    /// Absence flag workflow state.
    FlagStatus (default = Pending) {
        Pending => "pending" | "open",
        Cleared => "cleared" | "resolved",
    }
}

// ---------------------------------------------------------------------------
// Normalizer entry point
// ---------------------------------------------------------------------------

/// Entity families that carry a status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Task,
    Homework,
    Exercise,
    Attendance,
    AbsenceFlag,
}

/// A status value already mapped onto its family's canonical vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalStatus {
    Task(TaskStatus),
    Homework(HomeworkStatus),
    Exercise(ExerciseStatus),
    Attendance(AttendanceMark),
    AbsenceFlag(FlagStatus),
}

impl CanonicalStatus {
    pub fn kind(self) -> EntityKind {
        match self {
            Self::Task(_) => EntityKind::Task,
            Self::Homework(_) => EntityKind::Homework,
            Self::Exercise(_) => EntityKind::Exercise,
            Self::Attendance(_) => EntityKind::Attendance,
            Self::AbsenceFlag(_) => EntityKind::AbsenceFlag,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task(s) => s.as_str(),
            Self::Homework(s) => s.as_str(),
            Self::Exercise(s) => s.as_str(),
            Self::Attendance(s) => s.as_str(),
            Self::AbsenceFlag(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw status string for the given entity family onto its canonical
/// value.
///
/// Unknown values map to `pending` for tasks, homework and absence flags,
/// `not_marked` for attendance and `available` for exercises.
pub fn normalize(kind: EntityKind, raw: &str) -> CanonicalStatus {
    match kind {
        EntityKind::Task => CanonicalStatus::Task(TaskStatus::from_raw(raw)),
        EntityKind::Homework => CanonicalStatus::Homework(HomeworkStatus::from_raw(raw)),
        EntityKind::Exercise => CanonicalStatus::Exercise(ExerciseStatus::from_raw(raw)),
        EntityKind::Attendance => CanonicalStatus::Attendance(AttendanceMark::from_raw(raw)),
        EntityKind::AbsenceFlag => CanonicalStatus::AbsenceFlag(FlagStatus::from_raw(raw)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
