//! Project CRUD. Namespaces are validated as DNS-1123 labels.

use axum::extract::State;
use kublade_core::error::CoreError;
use kublade_core::types::DbId;
use kublade_core::validation::{validate_name, validate_namespace};
use kublade_db::models::project::{CreateProject, Project, UpdateProject};
use kublade_db::repositories::ProjectRepo;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::extract::{ApiPath, ValidJson};
use crate::middleware::auth::AuthUser;
use crate::response::Envelope;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    pub namespace: Option<String>,
}

/// GET /api/v1/projects
pub async fn list(State(state): State<AppState>) -> AppResult<Envelope<Vec<Project>>> {
    let projects = ProjectRepo::list(&state.pool).await?;
    Ok(Envelope::ok("Projects", projects))
}

/// POST /api/v1/projects
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(input): ValidJson<CreateProjectRequest>,
) -> AppResult<Envelope<Project>> {
    validate_name("Name", &input.name)?;
    validate_namespace(&input.namespace)?;

    let project = ProjectRepo::create(
        &state.pool,
        user.user_id,
        &CreateProject {
            name: input.name,
            namespace: input.namespace,
        },
    )
    .await?;

    tracing::info!(project_id = %project.id, user_id = %user.user_id, "Project created");
    Ok(Envelope::created("Project created", project))
}

/// GET /api/v1/projects/{project_id}
pub async fn get(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<DbId>,
) -> AppResult<Envelope<Project>> {
    let project = ProjectRepo::find_by_id(&state.pool, project_id)
        .await?
        .ok_or(CoreError::not_found("Project", project_id))?;
    Ok(Envelope::ok("Project", project))
}

/// PUT /api/v1/projects/{project_id}
pub async fn update(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<DbId>,
    ValidJson(input): ValidJson<UpdateProjectRequest>,
) -> AppResult<Envelope<Project>> {
    if let Some(name) = &input.name {
        validate_name("Name", name)?;
    }
    if let Some(namespace) = &input.namespace {
        validate_namespace(namespace)?;
    }

    let project = ProjectRepo::update(
        &state.pool,
        project_id,
        &UpdateProject {
            name: input.name,
            namespace: input.namespace,
        },
    )
    .await?
    .ok_or(CoreError::not_found("Project", project_id))?;

    Ok(Envelope::ok("Project updated", project))
}

/// DELETE /api/v1/projects/{project_id}
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<DbId>,
) -> AppResult<Envelope<serde_json::Value>> {
    if !ProjectRepo::soft_delete(&state.pool, project_id).await? {
        return Err(CoreError::not_found("Project", project_id).into());
    }
    tracing::info!(project_id = %project_id, "Project deleted");
    Ok(Envelope::ok("Project deleted", serde_json::json!({ "id": project_id })))
}
