//! AI chat message model and DTOs.

use kublade_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `ai_chat_messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AiChatMessage {
    pub id: DbId,
    pub project_id: DbId,
    pub user_id: Option<DbId>,
    /// One of `user`, `assistant`, `system`.
    pub role: String,
    pub content: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for appending a message to a project's chat.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAiChatMessage {
    pub role: String,
    pub content: String,
}
