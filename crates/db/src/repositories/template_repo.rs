//! Repository for the `templates` table.

use kublade_core::types::{new_id, DbId};
use sqlx::PgPool;

use crate::models::template::{CreateTemplate, Template, UpdateTemplate};

const COLUMNS: &str = "id, user_id, name, netpol, git_url, git_branch, git_path, \
                       last_imported_at, last_import_commit, created_at, updated_at";

pub struct TemplateRepo;

impl TemplateRepo {
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        input: &CreateTemplate,
    ) -> Result<Template, sqlx::Error> {
        let query = format!(
            "INSERT INTO templates (id, user_id, name, netpol, git_url, git_branch, git_path)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(new_id())
            .bind(user_id)
            .bind(input.name.trim())
            .bind(input.netpol)
            .bind(&input.git_url)
            .bind(&input.git_branch)
            .bind(&input.git_path)
            .fetch_one(pool)
            .await
    }

    /// Find a template by ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Template>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM templates WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Template>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM templates WHERE deleted_at IS NULL ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Template>(&query).fetch_all(pool).await
    }

    /// IDs of every live template, oldest first. Feeds the import dispatcher.
    pub async fn list_ids(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM templates WHERE deleted_at IS NULL ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(pool)
        .await
    }

    /// Update a template. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTemplate,
    ) -> Result<Option<Template>, sqlx::Error> {
        let query = format!(
            "UPDATE templates SET
                name = COALESCE($2, name),
                netpol = COALESCE($3, netpol),
                git_url = COALESCE($4, git_url),
                git_branch = COALESCE($5, git_branch),
                git_path = COALESCE($6, git_path)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(input.netpol)
            .bind(&input.git_url)
            .bind(&input.git_branch)
            .bind(&input.git_path)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a template. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE templates SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
