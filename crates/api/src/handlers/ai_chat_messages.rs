//! Handlers for a project's AI chat (`/projects/{project_id}/chat`).

use axum::extract::State;
use kublade_core::error::CoreError;
use kublade_core::types::DbId;
use kublade_core::validation::{validate_chat_content, validate_chat_role};
use kublade_db::models::ai_chat_message::{AiChatMessage, CreateAiChatMessage};
use kublade_db::repositories::{AiChatMessageRepo, ProjectRepo};
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::extract::{ApiPath, ValidJson};
use crate::middleware::auth::AuthUser;
use crate::response::Envelope;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChatMessageRequest {
    pub role: String,
    #[validate(length(min = 1, message = "Message content must not be empty"))]
    pub content: String,
}

/// GET /api/v1/projects/{project_id}/chat
pub async fn list(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<DbId>,
) -> AppResult<Envelope<Vec<AiChatMessage>>> {
    ensure_project(&state, project_id).await?;
    let messages = AiChatMessageRepo::list_for_project(&state.pool, project_id).await?;
    Ok(Envelope::ok("Chat messages", messages))
}

/// POST /api/v1/projects/{project_id}/chat
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(project_id): ApiPath<DbId>,
    ValidJson(input): ValidJson<CreateChatMessageRequest>,
) -> AppResult<Envelope<AiChatMessage>> {
    validate_chat_role(&input.role)?;
    validate_chat_content(&input.content)?;
    ensure_project(&state, project_id).await?;

    let message = AiChatMessageRepo::create(
        &state.pool,
        project_id,
        user.user_id,
        &CreateAiChatMessage {
            role: input.role,
            content: input.content,
        },
    )
    .await?;

    tracing::debug!(project_id = %project_id, message_id = %message.id, "Chat message stored");
    Ok(Envelope::created("Chat message created", message))
}

async fn ensure_project(state: &AppState, project_id: DbId) -> AppResult<()> {
    ProjectRepo::find_by_id(&state.pool, project_id)
        .await?
        .ok_or(CoreError::not_found("Project", project_id))?;
    Ok(())
}
