//! Repository for the `ai_chat_messages` table.

use kublade_core::types::{new_id, DbId};
use sqlx::PgPool;

use crate::models::ai_chat_message::{AiChatMessage, CreateAiChatMessage};

const COLUMNS: &str = "id, project_id, user_id, role, content, created_at, updated_at";

pub struct AiChatMessageRepo;

impl AiChatMessageRepo {
    pub async fn create(
        pool: &PgPool,
        project_id: DbId,
        user_id: DbId,
        input: &CreateAiChatMessage,
    ) -> Result<AiChatMessage, sqlx::Error> {
        let query = format!(
            "INSERT INTO ai_chat_messages (id, project_id, user_id, role, content)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AiChatMessage>(&query)
            .bind(new_id())
            .bind(project_id)
            .bind(user_id)
            .bind(&input.role)
            .bind(&input.content)
            .fetch_one(pool)
            .await
    }

    /// The conversation of one project, oldest message first.
    pub async fn list_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<AiChatMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ai_chat_messages
             WHERE project_id = $1
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, AiChatMessage>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }
}
