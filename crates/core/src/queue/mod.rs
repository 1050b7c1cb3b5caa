//! Background job queue contract.
//!
//! The API server enqueues work and reports queue health; the worker claims
//! and settles jobs. Both talk to a [`JobQueue`], implemented over Postgres in
//! `kublade-db` and in memory by [`memory::MemoryJobQueue`].
//!
//! A job may carry a `unique_key`. While a job holding that key is pending or
//! running, every further enqueue with the same key is refused with
//! [`EnqueueOutcome::Duplicate`]. The lock is released when the owning job
//! completes or fails for the last time; retries keep it.
//!
//! Settling a job takes the `attempts` value returned by the claim. A job
//! requeued as stale and claimed again only accepts the newer attempt, so a
//! slow first runner cannot release a lock the second one still holds.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// Default number of attempts before a job is marked failed.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 1;

/// Errors from a queue backend.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Job {0} not found")]
    JobNotFound(DbId),

    /// The job is not running, or a later claim took it over.
    #[error("Job {id} is not running under attempt {attempt}")]
    NotRunning { id: DbId, attempt: i32 },

    #[error("Queue backend error: {0}")]
    Backend(String),
}

/// Lifecycle state of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    /// Completed and failed jobs are never touched again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Pending and running jobs hold their unique lock.
    pub fn holds_lock(self) -> bool {
        !self.is_terminal()
    }
}

/// A job to be enqueued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    pub job_type: String,
    pub queue: String,
    pub payload: serde_json::Value,
    /// Backend-enforced uniqueness key; `None` for ordinary jobs.
    pub unique_key: Option<String>,
    /// Free-form labels for observability (`"template:<id>"`).
    pub tags: Vec<String>,
    pub max_attempts: i32,
}

impl NewJob {
    pub fn new(job_type: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            job_type: job_type.into(),
            queue: queue.into(),
            payload: serde_json::Value::Object(Default::default()),
            unique_key: None,
            tags: Vec::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn unique_by(mut self, key: impl Into<String>) -> Self {
        self.unique_key = Some(key.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_attempts(mut self, attempts: i32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }
}

/// Result of [`JobQueue::enqueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued(DbId),
    /// A job holding the same unique key is still pending or running.
    Duplicate { unique_key: String },
}

impl EnqueueOutcome {
    pub fn job_id(&self) -> Option<DbId> {
        match self {
            EnqueueOutcome::Enqueued(id) => Some(*id),
            EnqueueOutcome::Duplicate { .. } => None,
        }
    }
}

/// Result of [`JobQueue::fail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Attempts remain; the job is pending again.
    Retrying { attempts: i32 },
    /// No attempts remain; the job is failed and its lock released.
    Failed,
}

/// A job as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueuedJob {
    pub id: DbId,
    pub job_type: String,
    pub queue: String,
    pub payload: serde_json::Value,
    pub unique_key: Option<String>,
    pub tags: Vec<String>,
    pub state: JobState,
    pub attempts: i32,
    pub max_attempts: i32,
    pub error_message: Option<String>,
    pub enqueued_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

/// Per-queue job counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub queue: String,
    pub pending: i64,
    pub running: i64,
    pub completed: i64,
    pub failed: i64,
}

/// A worker's periodic liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerHeartbeat {
    pub name: String,
    pub queues: Vec<String>,
    pub paused: bool,
    pub last_seen_at: Timestamp,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Add a job. Atomic with respect to the unique key.
    async fn enqueue(&self, job: NewJob) -> Result<EnqueueOutcome, QueueError>;

    /// Claim the oldest pending job on the first non-empty queue of `queues`,
    /// marking it running and counting the attempt.
    async fn claim_next(&self, queues: &[String]) -> Result<Option<QueuedJob>, QueueError>;

    /// Mark a job running under `attempt` completed and release its unique
    /// lock.
    async fn complete(&self, id: DbId, attempt: i32) -> Result<(), QueueError>;

    /// Record a failed `attempt`. Requeues while attempts remain.
    async fn fail(&self, id: DbId, attempt: i32, error: &str) -> Result<FailOutcome, QueueError>;

    /// Job counts grouped by queue, ordered by queue name.
    async fn counts(&self) -> Result<Vec<QueueCounts>, QueueError>;

    /// Return jobs running since before `started_before` to pending.
    async fn requeue_stale(&self, started_before: Timestamp) -> Result<u64, QueueError>;

    async fn record_heartbeat(&self, heartbeat: &WorkerHeartbeat) -> Result<(), QueueError>;

    async fn workers(&self) -> Result<Vec<WorkerHeartbeat>, QueueError>;
}
