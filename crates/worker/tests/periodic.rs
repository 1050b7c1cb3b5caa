//! Heartbeat and reaper against the in-memory queue.

use std::time::Duration;

use kublade_core::queue::memory::MemoryJobQueue;
use kublade_core::queue::{JobQueue, JobState, NewJob};
use kublade_core::queue_status::{derive_status, QueueStatus};
use kublade_worker::heartbeat::{beat, WorkerIdentity};
use kublade_worker::reaper::sweep;

fn identity(paused: bool) -> WorkerIdentity {
    WorkerIdentity {
        name: "worker-1".to_string(),
        queues: vec!["dispatchers".to_string()],
        paused,
    }
}

#[tokio::test]
async fn heartbeat_makes_queue_running() {
    let queue = MemoryJobQueue::new();
    beat(&queue, &identity(false)).await.unwrap();

    let workers = queue.workers().await.unwrap();
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].name, "worker-1");
    assert_eq!(derive_status(&workers, chrono::Utc::now()), QueueStatus::Running);
}

#[tokio::test]
async fn paused_heartbeat_makes_queue_paused() {
    let queue = MemoryJobQueue::new();
    beat(&queue, &identity(true)).await.unwrap();

    let workers = queue.workers().await.unwrap();
    assert_eq!(derive_status(&workers, chrono::Utc::now()), QueueStatus::Paused);
}

#[tokio::test]
async fn repeated_beats_update_one_worker() {
    let queue = MemoryJobQueue::new();
    beat(&queue, &identity(false)).await.unwrap();
    beat(&queue, &identity(true)).await.unwrap();

    let workers = queue.workers().await.unwrap();
    assert_eq!(workers.len(), 1);
    assert!(workers[0].paused);
}

#[tokio::test]
async fn sweep_requeues_only_stale_running_jobs() {
    let queue = MemoryJobQueue::new();
    queue.enqueue(NewJob::new("slow", "test")).await.unwrap();
    queue
        .claim_next(&["test".to_string()])
        .await
        .unwrap()
        .unwrap();

    // Running for well under an hour: left alone.
    assert_eq!(sweep(&queue, Duration::from_secs(3600)).await.unwrap(), 0);
    assert_eq!(queue.jobs()[0].state, JobState::Running);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(sweep(&queue, Duration::from_millis(1)).await.unwrap(), 1);
    assert_eq!(queue.jobs()[0].state, JobState::Pending);
}
