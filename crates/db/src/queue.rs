//! PostgreSQL-backed [`JobQueue`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use kublade_core::queue::{
    EnqueueOutcome, FailOutcome, JobQueue, JobState, NewJob, QueueCounts, QueueError, QueuedJob,
    WorkerHeartbeat,
};
use kublade_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::job::Job;
use crate::models::status::JobStatus;
use crate::repositories::{JobRepo, WorkerRepo};

fn backend(err: sqlx::Error) -> QueueError {
    QueueError::Backend(err.to_string())
}

fn into_queued(job: Job) -> Result<QueuedJob, QueueError> {
    job.into_queued()
        .map_err(|status_id| QueueError::Backend(format!("unknown job status id {status_id}")))
}

/// Job queue over the `jobs` table, shared by the API server and the worker.
#[derive(Clone)]
pub struct PgJobQueue {
    pool: PgPool,
}

impl PgJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Distinguish a missing job from one in the wrong state after a
    /// guarded update matched nothing.
    async fn not_settleable(&self, id: DbId, attempt: i32) -> QueueError {
        match JobRepo::find_by_id(&self.pool, id).await {
            Ok(Some(_)) => QueueError::NotRunning { id, attempt },
            Ok(None) => QueueError::JobNotFound(id),
            Err(e) => backend(e),
        }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, job: NewJob) -> Result<EnqueueOutcome, QueueError> {
        JobRepo::enqueue(&self.pool, &job).await.map_err(backend)
    }

    async fn claim_next(&self, queues: &[String]) -> Result<Option<QueuedJob>, QueueError> {
        JobRepo::claim_next(&self.pool, queues)
            .await
            .map_err(backend)?
            .map(into_queued)
            .transpose()
    }

    async fn complete(&self, id: DbId, attempt: i32) -> Result<(), QueueError> {
        match JobRepo::complete(&self.pool, id, attempt).await.map_err(backend)? {
            Some(_) => Ok(()),
            None => Err(self.not_settleable(id, attempt).await),
        }
    }

    async fn fail(&self, id: DbId, attempt: i32, error: &str) -> Result<FailOutcome, QueueError> {
        let Some(job) = JobRepo::fail(&self.pool, id, attempt, error)
            .await
            .map_err(backend)?
        else {
            return Err(self.not_settleable(id, attempt).await);
        };
        if job.status_id == JobStatus::Failed.id() {
            Ok(FailOutcome::Failed)
        } else {
            Ok(FailOutcome::Retrying {
                attempts: job.attempts,
            })
        }
    }

    async fn counts(&self) -> Result<Vec<QueueCounts>, QueueError> {
        let rows = JobRepo::counts(&self.pool).await.map_err(backend)?;

        let mut by_queue: BTreeMap<String, QueueCounts> = BTreeMap::new();
        for row in rows {
            let entry = by_queue.entry(row.queue.clone()).or_insert_with(|| QueueCounts {
                queue: row.queue.clone(),
                ..QueueCounts::default()
            });
            match JobStatus::from_id(row.status_id).map(JobState::from) {
                Some(JobState::Pending) => entry.pending += row.count,
                Some(JobState::Running) => entry.running += row.count,
                Some(JobState::Completed) => entry.completed += row.count,
                Some(JobState::Failed) => entry.failed += row.count,
                None => tracing::warn!(status_id = row.status_id, "Unknown job status in counts"),
            }
        }
        Ok(by_queue.into_values().collect())
    }

    async fn requeue_stale(&self, started_before: Timestamp) -> Result<u64, QueueError> {
        JobRepo::requeue_stale(&self.pool, started_before)
            .await
            .map_err(backend)
    }

    async fn record_heartbeat(&self, heartbeat: &WorkerHeartbeat) -> Result<(), QueueError> {
        WorkerRepo::upsert(&self.pool, heartbeat)
            .await
            .map_err(backend)
    }

    async fn workers(&self) -> Result<Vec<WorkerHeartbeat>, QueueError> {
        let rows = WorkerRepo::list(&self.pool).await.map_err(backend)?;
        Ok(rows.into_iter().map(WorkerHeartbeat::from).collect())
    }
}
