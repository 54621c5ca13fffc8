//! SchoolDesk domain core.
//!
//! Status lifecycles and dashboard aggregation for daily tasks, homework and
//! attendance. Pure logic only: records are fetched and persisted by the
//! caller, and every function takes the current instant as a parameter.

pub mod attendance;
pub mod error;
pub mod homework;
pub mod localize;
pub mod overdue;
pub mod progress;
pub mod status;
pub mod task;
pub mod types;
