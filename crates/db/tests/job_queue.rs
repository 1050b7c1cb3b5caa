//! Integration tests for the Postgres job queue.
//!
//! Require a database (`DATABASE_URL`); run with `cargo test -- --ignored`.

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use kublade_core::jobs;
use kublade_core::queue::{
    EnqueueOutcome, FailOutcome, JobQueue, JobState, NewJob, QueueError, WorkerHeartbeat,
};
use kublade_core::types::new_id;
use kublade_db::queue::PgJobQueue;
use sqlx::PgPool;

fn queues(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Uniqueness
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn dispatcher_is_refused_while_pending(pool: PgPool) {
    let queue = PgJobQueue::new(pool);

    let first = queue.enqueue(jobs::template_git_import_dispatcher()).await.unwrap();
    let second = queue.enqueue(jobs::template_git_import_dispatcher()).await.unwrap();

    assert_matches!(first, EnqueueOutcome::Enqueued(_));
    assert_matches!(
        second,
        EnqueueOutcome::Duplicate { ref unique_key } if unique_key == "template-git-import"
    );

    let counts = queue.counts().await.unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0].queue, "dispatchers");
    assert_eq!(counts[0].pending, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn lock_is_released_after_completion(pool: PgPool) {
    let queue = PgJobQueue::new(pool);

    let id = queue
        .enqueue(jobs::template_git_import_dispatcher())
        .await
        .unwrap()
        .job_id()
        .unwrap();
    let claimed = queue.claim_next(&queues(&["dispatchers"])).await.unwrap().unwrap();
    assert_eq!(claimed.id, id);
    assert_eq!(claimed.state, JobState::Running);
    assert_eq!(claimed.attempts, 1);

    assert_matches!(
        queue.enqueue(jobs::template_git_import_dispatcher()).await.unwrap(),
        EnqueueOutcome::Duplicate { .. }
    );

    queue.complete(id, claimed.attempts).await.unwrap();
    assert_matches!(
        queue.enqueue(jobs::template_git_import_dispatcher()).await.unwrap(),
        EnqueueOutcome::Enqueued(_)
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn retry_keeps_lock_until_terminal_failure(pool: PgPool) {
    let queue = PgJobQueue::new(pool);
    let job = NewJob::new("dispatch", "dispatchers")
        .unique_by("k")
        .with_max_attempts(2);

    let id = queue.enqueue(job.clone()).await.unwrap().job_id().unwrap();

    queue.claim_next(&queues(&["dispatchers"])).await.unwrap();
    assert_eq!(
        queue.fail(id, 1, "first").await.unwrap(),
        FailOutcome::Retrying { attempts: 1 }
    );
    assert_matches!(queue.enqueue(job.clone()).await.unwrap(), EnqueueOutcome::Duplicate { .. });

    queue.claim_next(&queues(&["dispatchers"])).await.unwrap();
    assert_eq!(queue.fail(id, 2, "second").await.unwrap(), FailOutcome::Failed);
    assert_matches!(queue.enqueue(job).await.unwrap(), EnqueueOutcome::Enqueued(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn concurrent_unique_enqueues_collapse_to_one(pool: PgPool) {
    let queue = PgJobQueue::new(pool);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move {
            queue.enqueue(jobs::template_git_import_dispatcher()).await.unwrap()
        }));
    }

    let mut enqueued = 0;
    for handle in handles {
        if let EnqueueOutcome::Enqueued(_) = handle.await.unwrap() {
            enqueued += 1;
        }
    }
    assert_eq!(enqueued, 1);
}

// ---------------------------------------------------------------------------
// Claiming and settling
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn claim_prefers_earlier_queues(pool: PgPool) {
    let queue = PgJobQueue::new(pool);

    let import = queue.enqueue(jobs::template_git_import(new_id())).await.unwrap();
    let dispatch = queue.enqueue(jobs::template_git_import_dispatcher()).await.unwrap();

    let order = queues(&["dispatchers", "git-import"]);
    let first = queue.claim_next(&order).await.unwrap().unwrap();
    let second = queue.claim_next(&order).await.unwrap().unwrap();

    assert_eq!(Some(first.id), dispatch.job_id());
    assert_eq!(Some(second.id), import.job_id());
    assert!(queue.claim_next(&order).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn settling_a_pending_job_is_rejected(pool: PgPool) {
    let queue = PgJobQueue::new(pool);
    let id = queue
        .enqueue(NewJob::new("a", "q"))
        .await
        .unwrap()
        .job_id()
        .unwrap();

    assert_matches!(queue.complete(id, 0).await, Err(QueueError::NotRunning { .. }));
    assert_matches!(queue.fail(new_id(), 1, "x").await, Err(QueueError::JobNotFound(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn earlier_claim_cannot_settle_a_reclaimed_job(pool: PgPool) {
    let queue = PgJobQueue::new(pool);
    let dispatchers = queues(&["dispatchers"]);
    queue.enqueue(jobs::template_git_import_dispatcher()).await.unwrap();

    let first = queue.claim_next(&dispatchers).await.unwrap().unwrap();
    queue
        .requeue_stale(Utc::now() + Duration::seconds(5))
        .await
        .unwrap();
    let second = queue.claim_next(&dispatchers).await.unwrap().unwrap();
    assert_eq!(second.attempts, first.attempts + 1);

    assert_matches!(
        queue.complete(first.id, first.attempts).await,
        Err(QueueError::NotRunning { .. })
    );
    assert_matches!(
        queue.enqueue(jobs::template_git_import_dispatcher()).await.unwrap(),
        EnqueueOutcome::Duplicate { .. }
    );

    queue.complete(second.id, second.attempts).await.unwrap();
    assert_matches!(
        queue.enqueue(jobs::template_git_import_dispatcher()).await.unwrap(),
        EnqueueOutcome::Enqueued(_)
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn stale_jobs_return_to_pending(pool: PgPool) {
    let queue = PgJobQueue::new(pool);
    queue.enqueue(NewJob::new("a", "q")).await.unwrap();
    queue.claim_next(&queues(&["q"])).await.unwrap().unwrap();

    let requeued = queue
        .requeue_stale(Utc::now() + Duration::seconds(5))
        .await
        .unwrap();
    assert_eq!(requeued, 1);
    assert!(queue.claim_next(&queues(&["q"])).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn heartbeat_upserts_by_name(pool: PgPool) {
    let queue = PgJobQueue::new(pool);
    let mut heartbeat = WorkerHeartbeat {
        name: "worker-1".to_string(),
        queues: queues(&["dispatchers"]),
        paused: false,
        last_seen_at: Utc::now(),
    };
    queue.record_heartbeat(&heartbeat).await.unwrap();
    heartbeat.paused = true;
    queue.record_heartbeat(&heartbeat).await.unwrap();

    let workers = queue.workers().await.unwrap();
    assert_eq!(workers.len(), 1);
    assert!(workers[0].paused);
}
