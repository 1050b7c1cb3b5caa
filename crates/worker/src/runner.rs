//! Job runner: claims jobs from the queue and executes them.
//!
//! Up to `concurrency` jobs run at once, each in its own task holding a
//! semaphore permit. A slot is acquired before a claim, so a job is never
//! claimed without capacity to run it. On cancellation no new job is claimed
//! and in-flight jobs run to completion.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kublade_core::queue::{FailOutcome, JobQueue, QueueError, QueuedJob};
use kublade_core::types::DbId;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Back-off after a queue error before the next claim.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Executes one job type.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The `job_type` this handler runs.
    fn job_type(&self) -> &'static str;

    /// Run the job. The returned value is logged; an error fails the attempt
    /// and its full chain is stored on the job.
    async fn handle(&self, job: &QueuedJob) -> anyhow::Result<serde_json::Value>;
}

/// Handlers by job type.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler`, replacing any earlier one for the same type.
    pub fn register(mut self, handler: Arc<dyn JobHandler>) -> Self {
        self.handlers.insert(handler.job_type(), handler);
        self
    }

    pub fn get(&self, job_type: &str) -> Option<&Arc<dyn JobHandler>> {
        self.handlers.get(job_type)
    }

    pub fn job_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.handlers.keys().copied().collect();
        types.sort_unstable();
        types
    }
}

/// How a job attempt was settled.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(serde_json::Value),
    Retrying { attempts: i32, error: String },
    Failed(String),
}

pub struct Runner {
    queue: Arc<dyn JobQueue>,
    registry: Arc<HandlerRegistry>,
    queues: Vec<String>,
    concurrency: usize,
    poll_interval: Duration,
}

impl Runner {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        registry: HandlerRegistry,
        queues: Vec<String>,
        concurrency: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            registry: Arc::new(registry),
            queues,
            concurrency: concurrency.max(1),
            poll_interval,
        }
    }

    /// Run until `cancel` fires, then wait for in-flight jobs.
    pub async fn run(&self, cancel: CancellationToken) {
        let slots = Arc::new(Semaphore::new(self.concurrency));
        let mut in_flight = JoinSet::new();

        tracing::info!(
            queues = ?self.queues,
            concurrency = self.concurrency,
            job_types = ?self.registry.job_types(),
            "Job runner started"
        );

        loop {
            while let Some(joined) = in_flight.try_join_next() {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Job task panicked");
                }
            }

            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let pause = match self.queue.claim_next(&self.queues).await {
                Ok(Some(job)) => {
                    let queue = Arc::clone(&self.queue);
                    let registry = Arc::clone(&self.registry);
                    in_flight.spawn(async move {
                        execute(queue.as_ref(), &registry, job).await;
                        drop(permit);
                    });
                    continue;
                }
                Ok(None) => self.poll_interval,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to claim job");
                    ERROR_BACKOFF
                }
            };
            drop(permit);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        tracing::info!(in_flight = in_flight.len(), "Job runner stopping");
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Job task panicked");
            }
        }
        tracing::info!("Job runner stopped");
    }

    /// Claim one job and run it inline.
    ///
    /// Returns `None` when every queue is empty.
    pub async fn run_once(&self) -> Result<Option<(DbId, JobOutcome)>, QueueError> {
        match self.queue.claim_next(&self.queues).await? {
            Some(job) => {
                let id = job.id;
                Ok(Some((id, execute(self.queue.as_ref(), &self.registry, job).await)))
            }
            None => Ok(None),
        }
    }
}

/// Run `job` with its handler and settle it on the queue.
pub async fn execute(queue: &dyn JobQueue, registry: &HandlerRegistry, job: QueuedJob) -> JobOutcome {
    let span = tracing::info_span!(
        "job",
        job_id = %job.id,
        job_type = %job.job_type,
        queue = %job.queue,
        attempt = job.attempts,
    );
    settle(queue, registry, job).instrument(span).await
}

async fn settle(queue: &dyn JobQueue, registry: &HandlerRegistry, job: QueuedJob) -> JobOutcome {
    let result = match registry.get(&job.job_type) {
        Some(handler) => handler.handle(&job).await,
        None => Err(anyhow::anyhow!(
            "no handler registered for job type '{}'",
            job.job_type
        )),
    };

    match result {
        Ok(value) => {
            if let Err(e) = queue.complete(job.id, job.attempts).await {
                tracing::error!(error = %e, "Failed to mark job completed");
            }
            tracing::info!(result = %value, "Job completed");
            JobOutcome::Completed(value)
        }
        Err(err) => {
            let error = format!("{err:#}");
            match queue.fail(job.id, job.attempts, &error).await {
                Ok(FailOutcome::Retrying { attempts }) => {
                    tracing::warn!(error = %error, attempts, "Job failed, will retry");
                    JobOutcome::Retrying { attempts, error }
                }
                Ok(FailOutcome::Failed) => {
                    tracing::error!(error = %error, "Job failed");
                    JobOutcome::Failed(error)
                }
                Err(e) => {
                    tracing::error!(error = %error, queue_error = %e, "Job failed and could not be settled");
                    JobOutcome::Failed(error)
                }
            }
        }
    }
}
