pub mod auth;
pub mod docs;
pub mod health;
pub mod projects;
pub mod queue;
pub mod templates;
pub mod users;

use axum::middleware::from_fn_with_state;
use axum::Router;

use crate::middleware::auth::authenticate;
use crate::state::AppState;

/// The `/api/v1` tree. Everything except login, refresh and docs sits behind
/// [`authenticate`].
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                          login (public)
/// /auth/refresh                        refresh (public)
/// /auth/logout                         logout
/// /auth/me                             current principal
///
/// /docs/openapi.json                   OpenAPI document (public)
///
/// /users                               list, create
/// /users/{user_id}                     get, update, delete
///
/// /projects                            list, create
/// /projects/{project_id}               get, update, delete
/// /projects/{project_id}/chat          list, create chat messages
///
/// /templates                           list, create
/// /templates/import                    dispatch git import
/// /templates/{template_id}             get, update, delete
/// /templates/{template_id}/files       imported files
///
/// /queue/status                        supervisor status and counts
/// ```
///
/// Everything except the public routes sits behind [`authenticate`]; the
/// resource routes are additionally permission-guarded per method.
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/users", users::router())
        .nest("/projects", projects::router())
        .nest("/templates", templates::router())
        .nest("/queue", queue::router())
        .route_layer(from_fn_with_state(state, authenticate));

    Router::new()
        .nest("/auth", auth::public_router())
        .nest("/docs", docs::router())
        .merge(protected)
}
