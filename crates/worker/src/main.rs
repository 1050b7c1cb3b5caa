//! Kublade background worker binary.

use std::sync::Arc;

use anyhow::Context;
use kublade_core::queue::JobQueue;
use kublade_db::queue::PgJobQueue;
use kublade_worker::config::WorkerConfig;
use kublade_worker::git::GitClient;
use kublade_worker::heartbeat::{self, WorkerIdentity};
use kublade_worker::jobs::{PgTemplateCatalog, TemplateGitImport, TemplateGitImportDispatcher};
use kublade_worker::runner::{HandlerRegistry, Runner};
use kublade_worker::{reaper, scheduler};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "kublade_worker=debug,kublade_db=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env().context("invalid worker configuration")?;
    init_tracing(config.log_json);
    tracing::info!(
        worker = %config.name,
        queues = ?config.queues,
        concurrency = config.concurrency,
        "Worker starting"
    );

    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = kublade_db::create_pool(&url)
        .await
        .context("failed to connect to the database")?;
    kublade_db::run_migrations(&pool)
        .await
        .context("failed to apply migrations")?;

    let queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::new(pool.clone()));

    // --- Handlers ---
    let handlers = HandlerRegistry::new()
        .register(Arc::new(TemplateGitImportDispatcher::new(
            Arc::new(PgTemplateCatalog::new(pool.clone())),
            Arc::clone(&queue),
        )))
        .register(Arc::new(TemplateGitImport::new(
            pool,
            GitClient::new(config.git_binary.clone(), config.git_timeout),
        )));

    // --- Background tasks ---
    let cancel = CancellationToken::new();
    let mut tasks = Vec::new();

    tasks.push(tokio::spawn(heartbeat::run(
        Arc::clone(&queue),
        WorkerIdentity {
            name: config.name.clone(),
            queues: config.queues.clone(),
            paused: config.paused,
        },
        cancel.clone(),
    )));
    tasks.push(tokio::spawn(reaper::run(
        Arc::clone(&queue),
        config.stale_job_after,
        cancel.clone(),
    )));
    match config.dispatch_interval {
        Some(every) => tasks.push(tokio::spawn(scheduler::run(
            Arc::clone(&queue),
            every,
            cancel.clone(),
        ))),
        None => tracing::info!("Import scheduler disabled"),
    }

    if config.paused {
        tracing::warn!("Worker is paused, no jobs will be claimed");
    } else {
        let runner = Runner::new(
            Arc::clone(&queue),
            handlers,
            config.queues.clone(),
            config.concurrency,
            config.poll_interval,
        );
        let token = cancel.clone();
        tasks.push(tokio::spawn(async move { runner.run(token).await }));
    }

    shutdown_signal().await;
    cancel.cancel();

    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Background task panicked");
        }
    }
    tracing::info!("Worker stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let fmt = tracing_subscriber::fmt::layer();
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt.json()).init();
    } else {
        registry.with(fmt).init();
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("Interrupted, finishing in-flight jobs"),
        () = terminate => tracing::info!("Terminated, finishing in-flight jobs"),
    }
}
