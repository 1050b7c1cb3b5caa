//! `/auth`: login and refresh are public, logout and me need a token.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes reachable without a token.
///
/// ```text
/// POST /login    -> login
/// POST /refresh  -> refresh
/// ```
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
}

/// Routes that require a valid access token but no particular permission.
///
/// ```text
/// POST /logout   -> logout
/// GET  /me       -> me
/// ```
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}
