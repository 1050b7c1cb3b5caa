//! Queue supervisor status derived from worker heartbeats.

use serde::Serialize;

use crate::queue::WorkerHeartbeat;
use crate::types::Timestamp;

/// A worker that has not reported within this many seconds is gone.
pub const HEARTBEAT_TIMEOUT_SECS: i64 = 90;

/// How often a worker should report.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// At least one fresh, unpaused worker.
    Running,
    /// Fresh workers exist but all are paused.
    Paused,
    /// No fresh worker.
    Inactive,
}

/// Workers whose last heartbeat is within [`HEARTBEAT_TIMEOUT_SECS`] of `now`.
pub fn fresh_workers(workers: &[WorkerHeartbeat], now: Timestamp) -> Vec<&WorkerHeartbeat> {
    let cutoff = now - chrono::Duration::seconds(HEARTBEAT_TIMEOUT_SECS);
    workers.iter().filter(|w| w.last_seen_at >= cutoff).collect()
}

pub fn derive_status(workers: &[WorkerHeartbeat], now: Timestamp) -> QueueStatus {
    let fresh = fresh_workers(workers, now);
    if fresh.is_empty() {
        QueueStatus::Inactive
    } else if fresh.iter().all(|w| w.paused) {
        QueueStatus::Paused
    } else {
        QueueStatus::Running
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn worker(name: &str, age_secs: i64, paused: bool) -> WorkerHeartbeat {
        WorkerHeartbeat {
            name: name.to_string(),
            queues: vec!["dispatchers".to_string()],
            paused,
            last_seen_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[test]
    fn no_workers_is_inactive() {
        assert_eq!(derive_status(&[], Utc::now()), QueueStatus::Inactive);
    }

    #[test]
    fn stale_workers_are_ignored() {
        let workers = [worker("w1", HEARTBEAT_TIMEOUT_SECS + 30, false)];
        assert_eq!(derive_status(&workers, Utc::now()), QueueStatus::Inactive);
    }

    #[test]
    fn one_fresh_unpaused_worker_is_running() {
        let workers = [worker("w1", 5, true), worker("w2", 5, false)];
        assert_eq!(derive_status(&workers, Utc::now()), QueueStatus::Running);
    }

    #[test]
    fn all_fresh_paused_is_paused() {
        let workers = [worker("w1", 5, true), worker("w2", 500, false)];
        assert_eq!(derive_status(&workers, Utc::now()), QueueStatus::Paused);
        assert_eq!(fresh_workers(&workers, Utc::now()).len(), 1);
    }
}
