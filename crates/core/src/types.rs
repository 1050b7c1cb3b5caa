/// All database primary keys are UUIDv7, generated application-side.
pub type DbId = uuid::Uuid;

/// Stored and serialised in UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a new time-ordered primary key.
pub fn new_id() -> DbId {
    uuid::Uuid::now_v7()
}
