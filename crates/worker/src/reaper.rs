//! Returns jobs orphaned by a crashed worker to the queue.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kublade_core::queue::{JobQueue, QueueError};
use tokio_util::sync::CancellationToken;

/// How often running jobs are checked.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Requeue every job running for longer than `stale_after`.
pub async fn sweep(queue: &dyn JobQueue, stale_after: Duration) -> Result<u64, QueueError> {
    let stale_after = chrono::Duration::from_std(stale_after).unwrap_or(chrono::Duration::MAX);
    let cutoff = Utc::now()
        .checked_sub_signed(stale_after)
        .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
    queue.requeue_stale(cutoff).await
}

pub async fn run(queue: Arc<dyn JobQueue>, stale_after: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    tracing::info!(stale_after_secs = stale_after.as_secs(), "Reaper started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reaper stopping");
                break;
            }
            _ = interval.tick() => {
                match sweep(queue.as_ref(), stale_after).await {
                    Ok(0) => tracing::debug!("Reaper: no stale jobs"),
                    Ok(requeued) => tracing::warn!(requeued, "Reaper: requeued stale jobs"),
                    Err(e) => tracing::error!(error = %e, "Reaper: sweep failed"),
                }
            }
        }
    }
}
