use chrono::SecondsFormat;

/// All primary keys are UUIDs generated by the application (v7) with a
/// `gen_random_uuid()` column default as fallback.
pub type DbId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a new time-ordered primary key.
pub fn new_id() -> DbId {
    uuid::Uuid::now_v7()
}

/// Wire format for timestamps in response DTOs (`2024-01-31T08:30:00Z`).
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// [`format_timestamp`] for nullable columns.
pub fn format_optional_timestamp(ts: Option<&Timestamp>) -> Option<String> {
    ts.map(format_timestamp)
}
