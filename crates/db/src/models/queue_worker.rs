//! Worker heartbeat row.

use kublade_core::queue::WorkerHeartbeat;
use kublade_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `queue_workers` table.
#[derive(Debug, Clone, FromRow)]
pub struct QueueWorker {
    pub name: String,
    pub queues: Vec<String>,
    pub paused: bool,
    pub last_seen_at: Timestamp,
}

impl From<QueueWorker> for WorkerHeartbeat {
    fn from(row: QueueWorker) -> Self {
        Self {
            name: row.name,
            queues: row.queues,
            paused: row.paused,
            last_seen_at: row.last_seen_at,
        }
    }
}
