//! Bearer-token authentication.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use kublade_core::error::CoreError;
use kublade_core::permission::PermissionSet;
use kublade_core::types::DbId;

use crate::config::JwtConfig;
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated principal.
///
/// Inserted into request extensions by [`authenticate`]; handlers take it as
/// an extractor:
///
/// ```ignore
/// async fn me(user: AuthUser) -> AppResult<Envelope<MeResponse>> { .. }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub email: String,
    pub permissions: PermissionSet,
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Core(CoreError::Unauthorized("Unauthorized".into())))
    }
}

/// Resolve the principal from the `Authorization: Bearer <token>` header.
pub fn principal_from_headers(headers: &HeaderMap, jwt: &JwtConfig) -> Result<AuthUser, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing Authorization header".into(),
            ))
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized(
            "Invalid Authorization format. Expected: Bearer <token>".into(),
        ))
    })?;

    let claims = jwt.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Bearer token rejected");
        AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
    })?;

    Ok(AuthUser {
        user_id: claims.sub,
        email: claims.email,
        permissions: PermissionSet::new(claims.permissions),
    })
}

/// Middleware: authenticate the request or answer 401.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = principal_from_headers(request.headers(), &state.config.jwt)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
