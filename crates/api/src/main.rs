//! Kublade API server binary.

use std::sync::Arc;

use anyhow::Context;
use kublade_api::config::ServerConfig;
use kublade_api::router::build_app_router;
use kublade_api::state::AppState;
use kublade_db::queue::PgJobQueue;
use kublade_db::DbPool;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "kublade_api=debug,kublade_db=info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env().context("invalid server configuration")?;
    init_tracing(config.log_json);

    let pool = open_database().await?;
    let addr = config.bind_addr()?;

    let state = AppState {
        queue: Arc::new(PgJobQueue::new(pool.clone())),
        pool,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, origins = ?config.cors_origins, "API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await
        .context("server error")?;

    tracing::info!("API stopped");
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

/// Connect, confirm the database answers, then bring the schema up to date.
async fn open_database() -> anyhow::Result<DbPool> {
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = kublade_db::create_pool(&url)
        .await
        .context("failed to connect to the database")?;
    kublade_db::health_check(&pool)
        .await
        .context("database did not answer")?;
    kublade_db::run_migrations(&pool)
        .await
        .context("failed to apply migrations")?;

    tracing::info!("Database ready");
    Ok(pool)
}

/// Resolves on Ctrl-C, or SIGTERM on Unix. If a handler cannot be installed
/// that signal is simply not awaited.
async fn wait_for_shutdown() {
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
        () = interrupt => tracing::info!("Interrupted, draining connections"),
        () = terminate => tracing::info!("Terminated, draining connections"),
    }
}
