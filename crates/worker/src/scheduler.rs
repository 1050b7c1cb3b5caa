//! Periodic trigger for the template git import dispatcher.

use std::sync::Arc;
use std::time::Duration;

use kublade_core::jobs::template_git_import_dispatcher;
use kublade_core::queue::{EnqueueOutcome, JobQueue, QueueError};
use tokio_util::sync::CancellationToken;

/// Enqueue the dispatcher once. A dispatcher already in flight makes this a
/// no-op.
pub async fn dispatch(queue: &dyn JobQueue) -> Result<EnqueueOutcome, QueueError> {
    let outcome = queue.enqueue(template_git_import_dispatcher()).await?;
    match &outcome {
        EnqueueOutcome::Enqueued(job_id) => {
            tracing::info!(job_id = %job_id, "Scheduled template import dispatcher");
        }
        EnqueueOutcome::Duplicate { unique_key } => {
            tracing::debug!(unique_key = %unique_key, "Dispatcher already in flight, skipping");
        }
    }
    Ok(outcome)
}

/// Dispatch every `every`, starting immediately, until `cancel` fires.
pub async fn run(queue: Arc<dyn JobQueue>, every: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(every);
    tracing::info!(interval_secs = every.as_secs(), "Import scheduler started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Import scheduler stopping");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = dispatch(queue.as_ref()).await {
                    tracing::error!(error = %e, "Failed to schedule import dispatcher");
                }
            }
        }
    }
}
