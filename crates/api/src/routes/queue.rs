//! Route definitions for the `/queue` resource.

use axum::routing::get;
use axum::Router;
use kublade_core::roles::PERM_QUEUE_VIEW;

use crate::handlers::queue;
use crate::middleware::permission::guarded;
use crate::state::AppState;

/// `/queue/status`, guarded by the queue view permission.
///
/// ```text
/// GET /status   -> status (ui.admin.queue.view)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/status", guarded(get(queue::status), PERM_QUEUE_VIEW))
}
