//! Liveness probe, mounted at the root rather than under `/api/v1`.

use std::time::Duration;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// A database slower than this counts as down.
const DB_PING_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
pub struct Health {
    /// `degraded` when the database does not answer.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/health",
        get(|State(state): State<AppState>| async move {
            let ping = tokio::time::timeout(DB_PING_TIMEOUT, kublade_db::health_check(&state.pool));
            let db_healthy = matches!(ping.await, Ok(Ok(())));
            if !db_healthy {
                tracing::warn!("Health check: database unreachable");
            }

            Json(Health {
                status: if db_healthy { "ok" } else { "degraded" },
                version: env!("CARGO_PKG_VERSION"),
                db_healthy,
            })
        }),
    )
}
