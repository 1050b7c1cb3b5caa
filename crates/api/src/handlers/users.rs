//! Handlers for the `/users` resource.

use axum::extract::State;
use kublade_core::error::CoreError;
use kublade_core::permission::PermissionTemplate;
use kublade_core::roles::ROLE_USER;
use kublade_core::types::DbId;
use kublade_core::validation::validate_name;
use kublade_db::models::user::{CreateUser, UpdateUser, UserResponse};
use kublade_db::repositories::{RoleRepo, SessionRepo, UserRepo};
use serde::Deserialize;
use validator::Validate;

use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiPath, ValidJson};
use crate::middleware::auth::AuthUser;
use crate::response::Envelope;
use crate::state::AppState;

/// Request body for `POST /users`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    /// Defaults to the `user` role.
    pub role_id: Option<DbId>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Request body for `PUT /users/{user_id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    pub role_id: Option<DbId>,
    pub permissions: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// GET /api/v1/users
pub async fn list(State(state): State<AppState>) -> AppResult<Envelope<Vec<UserResponse>>> {
    let users = UserRepo::list(&state.pool).await?;
    Ok(Envelope::ok(
        "Users",
        users.into_iter().map(UserResponse::from).collect(),
    ))
}

/// POST /api/v1/users
pub async fn create(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CreateUserRequest>,
) -> AppResult<Envelope<UserResponse>> {
    validate_name("Name", &input.name)?;
    validate_grants(&input.permissions)?;

    let role_id = match input.role_id {
        Some(id) => Some(ensure_role(&state, id).await?),
        None => RoleRepo::find_by_name(&state.pool, ROLE_USER)
            .await?
            .map(|role| role.id),
    };

    let password_hash = hash_password(&input.password)?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            name: input.name,
            email: input.email,
            password_hash,
            role_id,
            permissions: input.permissions,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User created");
    Ok(Envelope::created("User created", user.into()))
}

/// GET /api/v1/users/{user_id}
pub async fn get(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<DbId>,
) -> AppResult<Envelope<UserResponse>> {
    let user = UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(CoreError::not_found("User", user_id))?;
    Ok(Envelope::ok("User", user.into()))
}

/// PUT /api/v1/users/{user_id}
pub async fn update(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<DbId>,
    ValidJson(input): ValidJson<UpdateUserRequest>,
) -> AppResult<Envelope<UserResponse>> {
    if let Some(name) = &input.name {
        validate_name("Name", name)?;
    }
    if let Some(grants) = &input.permissions {
        validate_grants(grants)?;
    }
    if let Some(role_id) = input.role_id {
        ensure_role(&state, role_id).await?;
    }

    let password_hash = input
        .password
        .as_deref()
        .map(hash_password)
        .transpose()?;

    let changes = UpdateUser {
        name: input.name,
        email: input.email,
        password_hash,
        role_id: input.role_id,
        permissions: input.permissions,
        is_active: input.is_active,
    };
    let user = UserRepo::update(&state.pool, user_id, &changes)
        .await?
        .ok_or(CoreError::not_found("User", user_id))?;

    // A deactivated account or a new password ends every open session.
    if changes.is_active == Some(false) || changes.password_hash.is_some() {
        SessionRepo::revoke_all_for_user(&state.pool, user_id).await?;
    }

    tracing::info!(user_id = %user_id, "User updated");
    Ok(Envelope::ok("User updated", user.into()))
}

/// DELETE /api/v1/users/{user_id}
pub async fn delete(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(user_id): ApiPath<DbId>,
) -> AppResult<Envelope<serde_json::Value>> {
    if caller.user_id == user_id {
        return Err(AppError::Core(CoreError::Conflict(
            "You cannot delete your own account".into(),
        )));
    }

    if !UserRepo::soft_delete(&state.pool, user_id).await? {
        return Err(CoreError::not_found("User", user_id).into());
    }
    SessionRepo::revoke_all_for_user(&state.pool, user_id).await?;

    tracing::info!(user_id = %user_id, deleted_by = %caller.user_id, "User deleted");
    Ok(Envelope::ok("User deleted", serde_json::json!({ "id": user_id })))
}

/// Direct grants must be concrete names or wildcards, never templates.
fn validate_grants(grants: &[String]) -> Result<(), CoreError> {
    for grant in grants {
        let parsed = PermissionTemplate::parse(grant)?;
        if !parsed.placeholders().is_empty() || grant.contains('|') {
            return Err(CoreError::Validation(format!(
                "Permission '{grant}' must not contain placeholders or alternatives"
            )));
        }
    }
    Ok(())
}

async fn ensure_role(state: &AppState, role_id: DbId) -> AppResult<DbId> {
    RoleRepo::find_by_id(&state.pool, role_id)
        .await?
        .map(|role| role.id)
        .ok_or_else(|| AppError::BadRequest(format!("Role {role_id} does not exist")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_accept_names_and_wildcards() {
        let grants = vec!["ui.projects.view".to_string(), "ui.*".to_string(), "*".to_string()];
        assert!(validate_grants(&grants).is_ok());
    }

    #[test]
    fn grants_reject_templates() {
        for bad in ["ui.projects.{project_id}.view", "a|b", "ui..view"] {
            assert!(validate_grants(&[bad.to_string()]).is_err(), "{bad} should be rejected");
        }
    }
}
