//! Route definitions for the `/users` resource.

use axum::routing::{delete, get, post, put};
use axum::Router;
use kublade_core::roles::{PERM_USERS_CREATE, PERM_USERS_DELETE, PERM_USERS_UPDATE, PERM_USERS_VIEW};

use crate::handlers::users;
use crate::middleware::permission::guarded;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET    /            -> list      (ui.admin.users.view)
/// POST   /            -> create    (ui.admin.users.create)
/// GET    /{user_id}   -> get       (ui.admin.users.view)
/// PUT    /{user_id}   -> update    (ui.admin.users.update)
/// DELETE /{user_id}   -> delete    (ui.admin.users.delete)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            guarded(get(users::list), PERM_USERS_VIEW)
                .merge(guarded(post(users::create), PERM_USERS_CREATE)),
        )
        .route(
            "/{user_id}",
            guarded(get(users::get), PERM_USERS_VIEW)
                .merge(guarded(put(users::update), PERM_USERS_UPDATE))
                .merge(guarded(delete(users::delete), PERM_USERS_DELETE)),
        )
}
