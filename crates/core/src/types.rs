/// All entity identifiers handed out by the school API are 64-bit integers.
pub type DbId = i64;

/// A reference to a user (assignee, reviewer, staff member).
pub type UserId = DbId;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
