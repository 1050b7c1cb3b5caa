//! Handlers for the `/queue` resource.

use axum::extract::State;
use chrono::Utc;
use kublade_core::queue::{QueueCounts, WorkerHeartbeat};
use kublade_core::queue_status::{derive_status, fresh_workers, QueueStatus, HEARTBEAT_TIMEOUT_SECS};
use serde::Serialize;

use crate::error::AppResult;
use crate::response::Envelope;
use crate::state::AppState;

/// Snapshot returned by `GET /queue/status`.
#[derive(Debug, Serialize)]
pub struct QueueStatusResponse {
    pub status: QueueStatus,
    /// Workers seen within the heartbeat timeout.
    pub workers: Vec<WorkerHeartbeat>,
    pub queues: Vec<QueueCounts>,
    pub heartbeat_timeout_secs: i64,
}

/// GET /api/v1/queue/status
pub async fn status(State(state): State<AppState>) -> AppResult<Envelope<QueueStatusResponse>> {
    let workers = state.queue.workers().await?;
    let queues = state.queue.counts().await?;
    let now = Utc::now();

    let response = QueueStatusResponse {
        status: derive_status(&workers, now),
        workers: fresh_workers(&workers, now).into_iter().cloned().collect(),
        queues,
        heartbeat_timeout_secs: HEARTBEAT_TIMEOUT_SECS,
    };
    Ok(Envelope::ok("Queue status", response))
}
