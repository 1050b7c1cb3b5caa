use std::sync::Arc;

use kublade_core::queue::JobQueue;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind `Arc` or is already a handle.
#[derive(Clone)]
pub struct AppState {
    pub pool: kublade_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Queue the import dispatcher is enqueued on and queue status is read from.
    pub queue: Arc<dyn JobQueue>,
}
