//! The import dispatcher against the in-memory queue and a stub catalog.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use kublade_core::jobs::{
    self, TemplateGitImportPayload, QUEUE_DISPATCHERS, QUEUE_GIT_IMPORT, TEMPLATE_GIT_IMPORT,
    TEMPLATE_GIT_IMPORT_DISPATCHER,
};
use kublade_core::queue::memory::MemoryJobQueue;
use kublade_core::queue::{EnqueueOutcome, JobQueue, JobState};
use kublade_core::types::{new_id, DbId};
use kublade_worker::jobs::{TemplateCatalog, TemplateGitImportDispatcher};
use kublade_worker::runner::{self, HandlerRegistry, JobOutcome, Runner};
use kublade_worker::scheduler;

struct StubCatalog(Vec<DbId>);

#[async_trait]
impl TemplateCatalog for StubCatalog {
    async fn template_ids(&self) -> anyhow::Result<Vec<DbId>> {
        Ok(self.0.clone())
    }
}

struct UnreachableCatalog;

#[async_trait]
impl TemplateCatalog for UnreachableCatalog {
    async fn template_ids(&self) -> anyhow::Result<Vec<DbId>> {
        anyhow::bail!("catalog offline")
    }
}

fn dispatcher_runner(queue: &Arc<MemoryJobQueue>, catalog: Arc<dyn TemplateCatalog>) -> Runner {
    let dyn_queue: Arc<dyn JobQueue> = queue.clone();
    let registry = HandlerRegistry::new().register(Arc::new(TemplateGitImportDispatcher::new(
        catalog,
        Arc::clone(&dyn_queue),
    )));
    Runner::new(
        dyn_queue,
        registry,
        vec![QUEUE_DISPATCHERS.to_string()],
        1,
        Duration::from_millis(10),
    )
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dispatcher_enqueues_one_import_per_template() {
    let queue = Arc::new(MemoryJobQueue::new());
    let ids = vec![new_id(), new_id(), new_id()];
    let runner = dispatcher_runner(&queue, Arc::new(StubCatalog(ids.clone())));

    queue.enqueue(jobs::template_git_import_dispatcher()).await.unwrap();
    let (_, outcome) = runner.run_once().await.unwrap().expect("dispatcher should run");

    assert_eq!(
        outcome,
        JobOutcome::Completed(serde_json::json!({ "templates": 3, "enqueued": 3 }))
    );

    let imports = queue.jobs_of_type(TEMPLATE_GIT_IMPORT);
    assert_eq!(imports.len(), 3);
    for (job, id) in imports.iter().zip(&ids) {
        assert_eq!(job.queue, QUEUE_GIT_IMPORT);
        assert_eq!(job.state, JobState::Pending);
        let payload: TemplateGitImportPayload = serde_json::from_value(job.payload.clone()).unwrap();
        assert_eq!(payload.template_id, *id);
    }
}

#[tokio::test]
async fn dispatcher_with_no_templates_completes() {
    let queue = Arc::new(MemoryJobQueue::new());
    let runner = dispatcher_runner(&queue, Arc::new(StubCatalog(Vec::new())));

    queue.enqueue(jobs::template_git_import_dispatcher()).await.unwrap();
    let (_, outcome) = runner.run_once().await.unwrap().unwrap();

    assert_matches!(outcome, JobOutcome::Completed(_));
    assert!(queue.jobs_of_type(TEMPLATE_GIT_IMPORT).is_empty());
}

#[tokio::test]
async fn per_template_imports_are_not_deduplicated() {
    let queue = Arc::new(MemoryJobQueue::new());
    let id = new_id();

    for _ in 0..2 {
        let runner = dispatcher_runner(&queue, Arc::new(StubCatalog(vec![id])));
        queue.enqueue(jobs::template_git_import_dispatcher()).await.unwrap();
        runner.run_once().await.unwrap().unwrap();
    }

    assert_eq!(queue.jobs_of_type(TEMPLATE_GIT_IMPORT).len(), 2);
}

// ---------------------------------------------------------------------------
// Uniqueness across the dispatcher's lifetime
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scheduler_is_refused_while_dispatcher_in_flight() {
    let queue = Arc::new(MemoryJobQueue::new());

    let first = scheduler::dispatch(queue.as_ref()).await.unwrap();
    assert_matches!(first, EnqueueOutcome::Enqueued(_));

    let second = scheduler::dispatch(queue.as_ref()).await.unwrap();
    assert_matches!(second, EnqueueOutcome::Duplicate { unique_key } if unique_key == "template-git-import");

    assert_eq!(queue.jobs_of_type(TEMPLATE_GIT_IMPORT_DISPATCHER).len(), 1);
}

#[tokio::test]
async fn completed_dispatcher_releases_the_lock() {
    let queue = Arc::new(MemoryJobQueue::new());
    let runner = dispatcher_runner(&queue, Arc::new(StubCatalog(vec![new_id()])));

    scheduler::dispatch(queue.as_ref()).await.unwrap();
    runner.run_once().await.unwrap().unwrap();

    let again = scheduler::dispatch(queue.as_ref()).await.unwrap();
    assert_matches!(again, EnqueueOutcome::Enqueued(_));
}

#[tokio::test]
async fn failed_dispatcher_releases_the_lock_and_records_the_error() {
    let queue = Arc::new(MemoryJobQueue::new());
    let runner = dispatcher_runner(&queue, Arc::new(UnreachableCatalog));

    scheduler::dispatch(queue.as_ref()).await.unwrap();
    let (job_id, outcome) = runner.run_once().await.unwrap().unwrap();

    assert_eq!(outcome, JobOutcome::Failed("catalog offline".to_string()));
    let failed = queue
        .jobs()
        .into_iter()
        .find(|j| j.id == job_id)
        .unwrap();
    assert_eq!(failed.state, JobState::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("catalog offline"));

    let again = scheduler::dispatch(queue.as_ref()).await.unwrap();
    assert_matches!(again, EnqueueOutcome::Enqueued(_));
}

#[tokio::test]
async fn superseded_dispatcher_run_keeps_the_lock() {
    let queue = Arc::new(MemoryJobQueue::new());
    let dyn_queue: Arc<dyn JobQueue> = queue.clone();
    let registry = HandlerRegistry::new().register(Arc::new(TemplateGitImportDispatcher::new(
        Arc::new(StubCatalog(Vec::new())),
        Arc::clone(&dyn_queue),
    )));
    let dispatchers = [QUEUE_DISPATCHERS.to_string()];

    scheduler::dispatch(queue.as_ref()).await.unwrap();
    let stale = queue.claim_next(&dispatchers).await.unwrap().unwrap();
    queue
        .requeue_stale(chrono::Utc::now() + chrono::Duration::seconds(1))
        .await
        .unwrap();
    let current = queue.claim_next(&dispatchers).await.unwrap().unwrap();

    runner::execute(dyn_queue.as_ref(), &registry, stale).await;

    assert_eq!(queue.jobs()[0].state, JobState::Running);
    let again = scheduler::dispatch(queue.as_ref()).await.unwrap();
    assert_matches!(again, EnqueueOutcome::Duplicate { .. });

    runner::execute(dyn_queue.as_ref(), &registry, current).await;
    let again = scheduler::dispatch(queue.as_ref()).await.unwrap();
    assert_matches!(again, EnqueueOutcome::Enqueued(_));
}
