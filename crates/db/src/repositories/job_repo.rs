//! Repository for the `jobs` and `job_unique_locks` tables.
//!
//! Status transitions use [`JobStatus`]; no status literal appears in SQL.
//! A unique key is held by a row in `job_unique_locks` whose primary key is
//! the key itself, so acquiring it is a single `INSERT .. ON CONFLICT DO
//! NOTHING` inside the enqueue transaction.

use kublade_core::queue::{EnqueueOutcome, NewJob};
use kublade_core::types::{new_id, DbId, Timestamp};
use sqlx::PgPool;

use crate::models::job::{Job, QueueStatusCount};
use crate::models::status::JobStatus;

/// Every `jobs` column, in [`JobRow`] order.
const COLUMNS: &str = "\
    id, job_type, queue, payload, unique_key, tags, status_id, \
    attempts, max_attempts, error_message, \
    enqueued_at, available_at, started_at, completed_at, \
    created_at, updated_at";

/// Queue persistence. See [`crate::queue::PgJobQueue`] for the trait adapter.
pub struct JobRepo;

impl JobRepo {
    /// Insert a pending job, acquiring its unique key first if it has one.
    ///
    /// Concurrent enqueues with the same key serialise on the lock row's
    /// primary key; all but one observe the conflict and roll back.
    pub async fn enqueue(pool: &PgPool, job: &NewJob) -> Result<EnqueueOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let id = new_id();

        sqlx::query(
            "INSERT INTO jobs (id, job_type, queue, payload, unique_key, tags, status_id, max_attempts) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id)
        .bind(&job.job_type)
        .bind(&job.queue)
        .bind(&job.payload)
        .bind(&job.unique_key)
        .bind(&job.tags)
        .bind(JobStatus::Pending.id())
        .bind(job.max_attempts)
        .execute(&mut *tx)
        .await?;

        if let Some(key) = &job.unique_key {
            let acquired = sqlx::query(
                "INSERT INTO job_unique_locks (unique_key, job_id) VALUES ($1, $2) \
                 ON CONFLICT (unique_key) DO NOTHING",
            )
            .bind(key)
            .bind(id)
            .execute(&mut *tx)
            .await?;

            if acquired.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(EnqueueOutcome::Duplicate {
                    unique_key: key.clone(),
                });
            }
        }

        tx.commit().await?;
        Ok(EnqueueOutcome::Enqueued(id))
    }

    /// Claim the oldest available pending job, preferring queues earlier in `queues`.
    ///
    /// Uses `FOR UPDATE SKIP LOCKED` so concurrent workers never claim the same row.
    pub async fn claim_next(pool: &PgPool, queues: &[String]) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $2, attempts = attempts + 1, started_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE status_id = $3 AND queue = ANY($1) AND available_at <= NOW() \
                 ORDER BY array_position($1, queue), enqueued_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(queues)
            .bind(JobStatus::Running.id())
            .bind(JobStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Mark a job running under `attempt` completed and drop its unique lock.
    ///
    /// Returns `None` if the job does not exist, is not running, or was
    /// claimed again since.
    pub async fn complete(pool: &PgPool, id: DbId, attempt: i32) -> Result<Option<Job>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE jobs SET status_id = $2, completed_at = NOW() \
             WHERE id = $1 AND status_id = $3 AND attempts = $4 \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(JobStatus::Completed.id())
            .bind(JobStatus::Running.id())
            .bind(attempt)
            .fetch_optional(&mut *tx)
            .await?;

        if job.is_some() {
            sqlx::query("DELETE FROM job_unique_locks WHERE job_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(job)
    }

    /// Record the failure of `attempt` on a running job.
    ///
    /// While `attempts < max_attempts` the job goes back to pending and keeps
    /// its lock; otherwise it is failed and the lock is dropped. Returns `None`
    /// if the job does not exist or is not running under `attempt`.
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        attempt: i32,
        error: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE jobs SET \
                error_message = $2, \
                status_id = CASE WHEN attempts < max_attempts THEN $3 ELSE $4 END, \
                started_at = CASE WHEN attempts < max_attempts THEN NULL ELSE started_at END, \
                completed_at = CASE WHEN attempts < max_attempts THEN NULL ELSE NOW() END \
             WHERE id = $1 AND status_id = $5 AND attempts = $6 \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(error)
            .bind(JobStatus::Pending.id())
            .bind(JobStatus::Failed.id())
            .bind(JobStatus::Running.id())
            .bind(attempt)
            .fetch_optional(&mut *tx)
            .await?;

        if job.as_ref().is_some_and(|j| j.status_id == JobStatus::Failed.id()) {
            sqlx::query("DELETE FROM job_unique_locks WHERE job_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(job)
    }

    /// Job counts grouped by queue and status.
    pub async fn counts(pool: &PgPool) -> Result<Vec<QueueStatusCount>, sqlx::Error> {
        sqlx::query_as::<_, QueueStatusCount>(
            "SELECT queue, status_id, COUNT(*) AS count FROM jobs \
             GROUP BY queue, status_id ORDER BY queue ASC",
        )
        .fetch_all(pool)
        .await
    }

    /// Return jobs stuck in running since before `started_before` to pending.
    pub async fn requeue_stale(pool: &PgPool, started_before: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status_id = $1, started_at = NULL \
             WHERE status_id = $2 AND started_at < $3",
        )
        .bind(JobStatus::Pending.id())
        .bind(JobStatus::Running.id())
        .bind(started_before)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
