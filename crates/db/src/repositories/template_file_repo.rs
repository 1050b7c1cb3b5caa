//! Repository for the `template_files` table.

use kublade_core::types::{new_id, DbId};
use sqlx::PgPool;

use crate::models::template_file::{ImportedFile, TemplateFile};

const COLUMNS: &str = "id, template_id, path, content, created_at";

/// Files belonging to a template, written only by the git import.
pub struct TemplateFileRepo;

impl TemplateFileRepo {
    /// Files of one template, ordered by path.
    pub async fn list_for_template(
        pool: &PgPool,
        template_id: DbId,
    ) -> Result<Vec<TemplateFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM template_files WHERE template_id = $1 ORDER BY path ASC"
        );
        sqlx::query_as::<_, TemplateFile>(&query)
            .bind(template_id)
            .fetch_all(pool)
            .await
    }

    /// Replace every file of a template and stamp the import, in one transaction.
    ///
    /// Returns `false` without touching anything if the template is gone
    /// (deleted between dispatch and import).
    pub async fn replace_all(
        pool: &PgPool,
        template_id: DbId,
        files: &[ImportedFile],
        commit: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let stamped = sqlx::query(
            "UPDATE templates SET last_imported_at = NOW(), last_import_commit = $2
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(template_id)
        .bind(commit)
        .execute(&mut *tx)
        .await?;
        if stamped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM template_files WHERE template_id = $1")
            .bind(template_id)
            .execute(&mut *tx)
            .await?;

        for file in files {
            sqlx::query(
                "INSERT INTO template_files (id, template_id, path, content)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(new_id())
            .bind(template_id)
            .bind(&file.path)
            .bind(&file.content)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}
