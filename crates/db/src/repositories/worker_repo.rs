//! Repository for the `queue_workers` heartbeat table.

use kublade_core::queue::WorkerHeartbeat;
use sqlx::PgPool;

use crate::models::queue_worker::QueueWorker;

pub struct WorkerRepo;

impl WorkerRepo {
    /// Insert or refresh a worker's heartbeat row.
    pub async fn upsert(pool: &PgPool, heartbeat: &WorkerHeartbeat) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO queue_workers (name, queues, paused, last_seen_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (name) DO UPDATE SET
                queues = EXCLUDED.queues,
                paused = EXCLUDED.paused,
                last_seen_at = EXCLUDED.last_seen_at",
        )
        .bind(&heartbeat.name)
        .bind(&heartbeat.queues)
        .bind(heartbeat.paused)
        .bind(heartbeat.last_seen_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<QueueWorker>, sqlx::Error> {
        sqlx::query_as::<_, QueueWorker>(
            "SELECT name, queues, paused, last_seen_at FROM queue_workers ORDER BY name ASC",
        )
        .fetch_all(pool)
        .await
    }
}
