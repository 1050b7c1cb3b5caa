//! Route definitions for the `/projects` resource, including each project's
//! chat under `/projects/{project_id}/chat`.

use axum::routing::{delete, get, post, put};
use axum::Router;
use kublade_core::roles::{
    PERM_PROJECTS_CREATE, PERM_PROJECTS_VIEW, PERM_PROJECT_CHAT, PERM_PROJECT_DELETE,
    PERM_PROJECT_UPDATE, PERM_PROJECT_VIEW,
};

use crate::handlers::{ai_chat_messages, projects};
use crate::middleware::permission::guarded;
use crate::state::AppState;

/// `/projects`, including the nested chat resource.
///
/// ```text
/// GET    /                     -> list
/// POST   /                     -> create
/// GET    /{project_id}         -> get
/// PUT    /{project_id}         -> update
/// DELETE /{project_id}         -> delete
///
/// GET    /{project_id}/chat    -> ai_chat_messages::list
/// POST   /{project_id}/chat    -> ai_chat_messages::create
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            guarded(get(projects::list), PERM_PROJECTS_VIEW)
                .merge(guarded(post(projects::create), PERM_PROJECTS_CREATE)),
        )
        .route(
            "/{project_id}",
            guarded(get(projects::get), PERM_PROJECT_VIEW)
                .merge(guarded(put(projects::update), PERM_PROJECT_UPDATE))
                .merge(guarded(delete(projects::delete), PERM_PROJECT_DELETE)),
        )
        .route(
            "/{project_id}/chat",
            guarded(
                get(ai_chat_messages::list).post(ai_chat_messages::create),
                PERM_PROJECT_CHAT,
            ),
        )
}
