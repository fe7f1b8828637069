/// Scene submissions are keyed by time-ordered UUIDs (v7).
pub type SubmissionId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
