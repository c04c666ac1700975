/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Snapshot dates are calendar days in UTC.
pub type SnapshotDate = chrono::NaiveDate;
