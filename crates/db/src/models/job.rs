//! Queue job row and its conversion into the queue contract type.

use kublade_core::queue::{JobState, QueuedJob};
use kublade_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::{JobStatus, StatusId};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub job_type: String,
    pub queue: String,
    pub payload: serde_json::Value,
    pub unique_key: Option<String>,
    pub tags: Vec<String>,
    pub status_id: StatusId,
    pub attempts: i32,
    pub max_attempts: i32,
    pub error_message: Option<String>,
    pub enqueued_at: Timestamp,
    pub available_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// Lifecycle state, or `None` if `status_id` is not a known status.
    pub fn state(&self) -> Option<JobState> {
        JobStatus::from_id(self.status_id).map(JobState::from)
    }

    /// Convert into the backend-neutral job, rejecting unknown status IDs.
    pub fn into_queued(self) -> Result<QueuedJob, StatusId> {
        let state = self.state().ok_or(self.status_id)?;
        Ok(QueuedJob {
            id: self.id,
            job_type: self.job_type,
            queue: self.queue,
            payload: self.payload,
            unique_key: self.unique_key,
            tags: self.tags,
            state,
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            error_message: self.error_message,
            enqueued_at: self.enqueued_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        })
    }
}

/// Per-queue, per-status job count from a `GROUP BY`.
#[derive(Debug, Clone, FromRow)]
pub struct QueueStatusCount {
    pub queue: String,
    pub status_id: StatusId,
    pub count: i64,
}
