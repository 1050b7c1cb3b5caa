//! Handlers for the `/templates` resource and the git import trigger.

use axum::extract::State;
use axum::http::StatusCode;
use kublade_core::error::CoreError;
use kublade_core::jobs;
use kublade_core::queue::EnqueueOutcome;
use kublade_core::types::DbId;
use kublade_core::validation::{
    normalize_git_path, validate_git_branch, validate_git_url, validate_name,
};
use kublade_db::models::template::{CreateTemplate, Template, UpdateTemplate};
use kublade_db::models::template_file::TemplateFile;
use kublade_db::repositories::{TemplateFileRepo, TemplateRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::extract::{ApiPath, ValidJson};
use crate::middleware::auth::AuthUser;
use crate::response::Envelope;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    #[serde(default)]
    pub netpol: bool,
    pub git_url: Option<String>,
    pub git_branch: Option<String>,
    pub git_path: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTemplateRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    pub netpol: Option<bool>,
    pub git_url: Option<String>,
    pub git_branch: Option<String>,
    pub git_path: Option<String>,
}

/// Result of `POST /templates/import`.
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    /// `false` when a dispatcher was already pending or running.
    pub dispatched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<DbId>,
}

/// Validated git source fields, ready to store.
struct GitSource {
    url: Option<String>,
    branch: Option<String>,
    path: Option<String>,
}

impl GitSource {
    fn parse(
        url: Option<String>,
        branch: Option<String>,
        path: Option<String>,
    ) -> Result<Self, CoreError> {
        let url = url.map(|u| u.trim().to_string());
        if let Some(url) = &url {
            validate_git_url(url)?;
        }
        let branch = branch.map(|b| b.trim().to_string());
        if let Some(branch) = &branch {
            validate_git_branch(branch)?;
        }
        let path = path.as_deref().map(normalize_git_path).transpose()?;
        Ok(Self { url, branch, path })
    }
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// GET /api/v1/templates
pub async fn list(State(state): State<AppState>) -> AppResult<Envelope<Vec<Template>>> {
    let templates = TemplateRepo::list(&state.pool).await?;
    Ok(Envelope::ok("Templates", templates))
}

/// POST /api/v1/templates
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(input): ValidJson<CreateTemplateRequest>,
) -> AppResult<Envelope<Template>> {
    validate_name("Name", &input.name)?;
    let git = GitSource::parse(input.git_url, input.git_branch, input.git_path)?;

    let template = TemplateRepo::create(
        &state.pool,
        user.user_id,
        &CreateTemplate {
            name: input.name,
            netpol: input.netpol,
            git_url: git.url,
            git_branch: git.branch,
            git_path: git.path,
        },
    )
    .await?;

    tracing::info!(template_id = %template.id, user_id = %user.user_id, "Template created");
    Ok(Envelope::created("Template created", template))
}

/// GET /api/v1/templates/{template_id}
pub async fn get(
    State(state): State<AppState>,
    ApiPath(template_id): ApiPath<DbId>,
) -> AppResult<Envelope<Template>> {
    let template = TemplateRepo::find_by_id(&state.pool, template_id)
        .await?
        .ok_or(CoreError::not_found("Template", template_id))?;
    Ok(Envelope::ok("Template", template))
}

/// PUT /api/v1/templates/{template_id}
pub async fn update(
    State(state): State<AppState>,
    ApiPath(template_id): ApiPath<DbId>,
    ValidJson(input): ValidJson<UpdateTemplateRequest>,
) -> AppResult<Envelope<Template>> {
    if let Some(name) = &input.name {
        validate_name("Name", name)?;
    }
    let git = GitSource::parse(input.git_url, input.git_branch, input.git_path)?;

    let template = TemplateRepo::update(
        &state.pool,
        template_id,
        &UpdateTemplate {
            name: input.name,
            netpol: input.netpol,
            git_url: git.url,
            git_branch: git.branch,
            git_path: git.path,
        },
    )
    .await?
    .ok_or(CoreError::not_found("Template", template_id))?;

    Ok(Envelope::ok("Template updated", template))
}

/// DELETE /api/v1/templates/{template_id}
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(template_id): ApiPath<DbId>,
) -> AppResult<Envelope<serde_json::Value>> {
    if !TemplateRepo::soft_delete(&state.pool, template_id).await? {
        return Err(CoreError::not_found("Template", template_id).into());
    }
    tracing::info!(template_id = %template_id, "Template deleted");
    Ok(Envelope::ok("Template deleted", serde_json::json!({ "id": template_id })))
}

/// GET /api/v1/templates/{template_id}/files
pub async fn files(
    State(state): State<AppState>,
    ApiPath(template_id): ApiPath<DbId>,
) -> AppResult<Envelope<Vec<TemplateFile>>> {
    TemplateRepo::find_by_id(&state.pool, template_id)
        .await?
        .ok_or(CoreError::not_found("Template", template_id))?;
    let files = TemplateFileRepo::list_for_template(&state.pool, template_id).await?;
    Ok(Envelope::ok("Template files", files))
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// POST /api/v1/templates/import
///
/// Enqueue the import dispatcher. At most one dispatcher is in flight, so a
/// second trigger while one is pending or running is answered with
/// `dispatched: false` rather than an error.
pub async fn import(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Envelope<DispatchResponse>> {
    match state.queue.enqueue(jobs::template_git_import_dispatcher()).await? {
        EnqueueOutcome::Enqueued(job_id) => {
            tracing::info!(job_id = %job_id, user_id = %user.user_id, "Template import dispatched");
            Ok(Envelope::ok(
                "Template import dispatched",
                DispatchResponse {
                    dispatched: true,
                    job_id: Some(job_id),
                },
            )
            .with_status(StatusCode::ACCEPTED))
        }
        EnqueueOutcome::Duplicate { unique_key } => {
            tracing::info!(unique_key = %unique_key, user_id = %user.user_id, "Template import already in flight");
            Ok(Envelope::ok(
                "Template import already in progress",
                DispatchResponse {
                    dispatched: false,
                    job_id: None,
                },
            ))
        }
    }
}
