//! Route definitions for the `/templates` resource.

use axum::routing::{delete, get, post, put};
use axum::Router;
use kublade_core::roles::{
    PERM_TEMPLATES_CREATE, PERM_TEMPLATES_IMPORT, PERM_TEMPLATES_VIEW, PERM_TEMPLATE_DELETE,
    PERM_TEMPLATE_UPDATE, PERM_TEMPLATE_VIEW,
};

use crate::handlers::templates;
use crate::middleware::permission::guarded;
use crate::state::AppState;

/// Routes mounted at `/templates`.
///
/// ```text
/// GET    /                        -> list
/// POST   /                        -> create
/// POST   /import                  -> import (dispatch)
/// GET    /{template_id}           -> get
/// PUT    /{template_id}           -> update
/// DELETE /{template_id}           -> delete
/// GET    /{template_id}/files     -> files
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            guarded(get(templates::list), PERM_TEMPLATES_VIEW)
                .merge(guarded(post(templates::create), PERM_TEMPLATES_CREATE)),
        )
        .route("/import", guarded(post(templates::import), PERM_TEMPLATES_IMPORT))
        .route(
            "/{template_id}",
            guarded(get(templates::get), PERM_TEMPLATE_VIEW)
                .merge(guarded(put(templates::update), PERM_TEMPLATE_UPDATE))
                .merge(guarded(delete(templates::delete), PERM_TEMPLATE_DELETE)),
        )
        .route(
            "/{template_id}/files",
            guarded(get(templates::files), PERM_TEMPLATE_VIEW),
        )
}
