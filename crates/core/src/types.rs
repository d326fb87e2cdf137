/// All relational primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Integer identity assigned by the legacy store to a person record.
pub type Interno = i32;
