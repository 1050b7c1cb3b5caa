//! Handlers for the `/auth` resource (login, refresh, logout, me).

use axum::extract::State;
use chrono::Utc;
use kublade_core::error::CoreError;
use kublade_core::permission::effective_permissions;
use kublade_core::types::DbId;
use kublade_db::models::session::CreateSession;
use kublade_db::models::user::{User, UserResponse};
use kublade_db::repositories::{RoleRepo, SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::password;
use crate::auth::tokens::{RefreshToken, TOKEN_TYPE};
use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::middleware::auth::AuthUser;
use crate::response::Envelope;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: String,
}

/// Request body for `POST /auth/refresh` and `POST /auth/logout`.
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token must not be empty"))]
    pub refresh_token: String,
}

/// Returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
    pub permissions: Vec<String>,
}

/// Returned by `GET /auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    /// Permissions carried by the presented token.
    pub permissions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<LoginRequest>,
) -> AppResult<Envelope<AuthResponse>> {
    let invalid = || AppError::Core(CoreError::Unauthorized("Invalid email or password".into()));

    let Some(user) = UserRepo::find_by_email(&state.pool, &input.email).await? else {
        password::equalize_timing(&input.password);
        return Err(invalid());
    };

    if !password::check_password(&input.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    UserRepo::record_login(&state.pool, user.id).await?;

    let (refresh, session) = new_session(&state, user.id);
    SessionRepo::create(&state.pool, &session).await?;

    tracing::info!(user_id = %user.id, "User logged in");
    let response = issue_tokens(&state, user, refresh.token).await?;
    Ok(Envelope::ok("Logged in", response))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token for a new token pair. The presented token is
/// revoked, so it works once.
pub async fn refresh(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<RefreshRequest>,
) -> AppResult<Envelope<AuthResponse>> {
    let expired =
        || AppError::Core(CoreError::Unauthorized("Invalid or expired refresh token".into()));

    let presented = RefreshToken::digest_of(&input.refresh_token);
    let session = SessionRepo::find_active_by_hash(&state.pool, &presented)
        .await?
        .ok_or_else(expired)?;

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;
    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let (refresh, replacement) = new_session(&state, user.id);
    SessionRepo::rotate(&state.pool, session.id, &replacement)
        .await?
        .ok_or_else(expired)?;

    tracing::info!(user_id = %user.id, "Refresh token rotated");
    let response = issue_tokens(&state, user, refresh.token).await?;
    Ok(Envelope::ok("Token refreshed", response))
}

/// POST /api/v1/auth/logout
///
/// Revoke the session behind the presented refresh token. The caller's other
/// sessions stay open. A token that is unknown, already revoked or owned by
/// someone else revokes nothing.
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(input): ValidJson<RefreshRequest>,
) -> AppResult<Envelope<serde_json::Value>> {
    let presented = RefreshToken::digest_of(&input.refresh_token);
    let session = SessionRepo::find_active_by_hash(&state.pool, &presented)
        .await?
        .filter(|session| session.user_id == user.user_id);

    let revoked = match session {
        Some(session) => SessionRepo::revoke(&state.pool, session.id).await?,
        None => false,
    };

    tracing::info!(user_id = %user.user_id, revoked, "User logged out");
    Ok(Envelope::ok("Logged out", serde_json::json!({ "revoked": revoked })))
}

/// GET /api/v1/auth/me
pub async fn me(State(state): State<AppState>, user: AuthUser) -> AppResult<Envelope<MeResponse>> {
    let row = UserRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    Ok(Envelope::ok(
        "Authenticated user",
        MeResponse {
            user: row.into(),
            permissions: user.permissions.to_sorted_vec(),
        },
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Mint a refresh token and the session row that will hold its digest.
fn new_session(state: &AppState, user_id: DbId) -> (RefreshToken, CreateSession) {
    let refresh = RefreshToken::generate();
    let session = CreateSession {
        user_id,
        refresh_token_hash: refresh.digest.clone(),
        expires_at: Utc::now() + state.config.jwt.refresh_ttl(),
    };
    (refresh, session)
}

/// Resolve the user's effective permissions and sign an access token.
async fn issue_tokens(
    state: &AppState,
    user: User,
    refresh_token: String,
) -> AppResult<AuthResponse> {
    let role_permissions = RoleRepo::permissions_for(&state.pool, user.role_id).await?;
    let permissions = effective_permissions(&role_permissions, &user.permissions);

    let access_token = state
        .config
        .jwt
        .sign(user.id, &user.email, permissions.clone())
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(AuthResponse {
        access_token,
        refresh_token,
        token_type: TOKEN_TYPE,
        expires_in: state.config.jwt.access_ttl().num_seconds(),
        user: user.into(),
        permissions,
    })
}
