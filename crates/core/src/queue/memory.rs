//! Process-local [`JobQueue`] for tests and single-node development.
//!
//! All state sits behind one mutex, so the unique-key check and the insert
//! happen under the same critical section, the same guarantee the Postgres
//! backend gets from its lock-table primary key.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{
    EnqueueOutcome, FailOutcome, JobQueue, JobState, NewJob, QueueCounts, QueueError, QueuedJob,
    WorkerHeartbeat,
};
use crate::types::{new_id, DbId, Timestamp};

#[derive(Default)]
struct Inner {
    /// Insertion order doubles as FIFO order.
    jobs: Vec<QueuedJob>,
    /// unique_key -> owning job id
    locks: HashMap<String, DbId>,
    workers: BTreeMap<String, WorkerHeartbeat>,
}

impl Inner {
    fn job_mut(&mut self, id: DbId) -> Result<&mut QueuedJob, QueueError> {
        self.jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(QueueError::JobNotFound(id))
    }

    /// The job, if it is running under `attempt`.
    fn claimed_mut(&mut self, id: DbId, attempt: i32) -> Result<&mut QueuedJob, QueueError> {
        let job = self.job_mut(id)?;
        if job.state != JobState::Running || job.attempts != attempt {
            return Err(QueueError::NotRunning { id, attempt });
        }
        Ok(job)
    }

    fn release_lock(&mut self, id: DbId) {
        self.locks.retain(|_, owner| *owner != id);
    }
}

/// In-memory job queue.
#[derive(Default)]
pub struct MemoryJobQueue {
    inner: Mutex<Inner>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, QueueError> {
        self.inner
            .lock()
            .map_err(|_| QueueError::Backend("memory queue mutex poisoned".into()))
    }

    /// Snapshot of every job ever enqueued, oldest first.
    pub fn jobs(&self) -> Vec<QueuedJob> {
        self.lock().map(|inner| inner.jobs.clone()).unwrap_or_default()
    }

    /// Snapshot of jobs of one type.
    pub fn jobs_of_type(&self, job_type: &str) -> Vec<QueuedJob> {
        self.jobs()
            .into_iter()
            .filter(|j| j.job_type == job_type)
            .collect()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: NewJob) -> Result<EnqueueOutcome, QueueError> {
        let mut inner = self.lock()?;

        if let Some(key) = &job.unique_key {
            if inner.locks.contains_key(key) {
                return Ok(EnqueueOutcome::Duplicate {
                    unique_key: key.clone(),
                });
            }
        }

        let id = new_id();
        if let Some(key) = &job.unique_key {
            inner.locks.insert(key.clone(), id);
        }
        inner.jobs.push(QueuedJob {
            id,
            job_type: job.job_type,
            queue: job.queue,
            payload: job.payload,
            unique_key: job.unique_key,
            tags: job.tags,
            state: JobState::Pending,
            attempts: 0,
            max_attempts: job.max_attempts,
            error_message: None,
            enqueued_at: Utc::now(),
            started_at: None,
            completed_at: None,
        });

        Ok(EnqueueOutcome::Enqueued(id))
    }

    async fn claim_next(&self, queues: &[String]) -> Result<Option<QueuedJob>, QueueError> {
        let mut inner = self.lock()?;

        for queue in queues {
            if let Some(job) = inner
                .jobs
                .iter_mut()
                .find(|j| j.state == JobState::Pending && &j.queue == queue)
            {
                job.state = JobState::Running;
                job.attempts += 1;
                job.started_at = Some(Utc::now());
                return Ok(Some(job.clone()));
            }
        }

        Ok(None)
    }

    async fn complete(&self, id: DbId, attempt: i32) -> Result<(), QueueError> {
        let mut inner = self.lock()?;
        let job = inner.claimed_mut(id, attempt)?;
        job.state = JobState::Completed;
        job.completed_at = Some(Utc::now());
        inner.release_lock(id);
        Ok(())
    }

    async fn fail(&self, id: DbId, attempt: i32, error: &str) -> Result<FailOutcome, QueueError> {
        let mut inner = self.lock()?;
        let job = inner.claimed_mut(id, attempt)?;
        job.error_message = Some(error.to_string());

        if job.attempts < job.max_attempts {
            job.state = JobState::Pending;
            job.started_at = None;
            return Ok(FailOutcome::Retrying {
                attempts: job.attempts,
            });
        }

        job.state = JobState::Failed;
        job.completed_at = Some(Utc::now());
        inner.release_lock(id);
        Ok(FailOutcome::Failed)
    }

    async fn counts(&self) -> Result<Vec<QueueCounts>, QueueError> {
        let inner = self.lock()?;
        let mut by_queue: BTreeMap<&str, QueueCounts> = BTreeMap::new();
        for job in &inner.jobs {
            let entry = by_queue.entry(job.queue.as_str()).or_insert_with(|| QueueCounts {
                queue: job.queue.clone(),
                ..QueueCounts::default()
            });
            match job.state {
                JobState::Pending => entry.pending += 1,
                JobState::Running => entry.running += 1,
                JobState::Completed => entry.completed += 1,
                JobState::Failed => entry.failed += 1,
            }
        }
        Ok(by_queue.into_values().collect())
    }

    async fn requeue_stale(&self, started_before: Timestamp) -> Result<u64, QueueError> {
        let mut inner = self.lock()?;
        let mut requeued = 0;
        for job in inner.jobs.iter_mut() {
            let stale = job.state == JobState::Running
                && job.started_at.is_some_and(|t| t < started_before);
            if stale {
                job.state = JobState::Pending;
                job.started_at = None;
                requeued += 1;
            }
        }
        Ok(requeued)
    }

    async fn record_heartbeat(&self, heartbeat: &WorkerHeartbeat) -> Result<(), QueueError> {
        let mut inner = self.lock()?;
        inner
            .workers
            .insert(heartbeat.name.clone(), heartbeat.clone());
        Ok(())
    }

    async fn workers(&self) -> Result<Vec<WorkerHeartbeat>, QueueError> {
        let inner = self.lock()?;
        Ok(inner.workers.values().cloned().collect())
    }
}
