//! Periodic worker heartbeat.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kublade_core::queue::{JobQueue, QueueError, WorkerHeartbeat};
use kublade_core::queue_status::HEARTBEAT_INTERVAL_SECS;
use tokio_util::sync::CancellationToken;

/// Identity reported on every beat.
#[derive(Debug, Clone)]
pub struct WorkerIdentity {
    pub name: String,
    pub queues: Vec<String>,
    pub paused: bool,
}

/// Record one heartbeat now.
pub async fn beat(queue: &dyn JobQueue, identity: &WorkerIdentity) -> Result<(), QueueError> {
    queue
        .record_heartbeat(&WorkerHeartbeat {
            name: identity.name.clone(),
            queues: identity.queues.clone(),
            paused: identity.paused,
            last_seen_at: Utc::now(),
        })
        .await
}

/// Beat every [`HEARTBEAT_INTERVAL_SECS`] until `cancel` fires.
pub async fn run(queue: Arc<dyn JobQueue>, identity: WorkerIdentity, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    tracing::info!(worker = %identity.name, paused = identity.paused, "Heartbeat started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Heartbeat stopping");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = beat(queue.as_ref(), &identity).await {
                    tracing::warn!(error = %e, "Failed to record heartbeat");
                }
            }
        }
    }
}
