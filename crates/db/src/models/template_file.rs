//! Template file model.

use kublade_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `template_files` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TemplateFile {
    pub id: DbId,
    pub template_id: DbId,
    /// Path relative to the template's git path, `/`-separated.
    pub path: String,
    pub content: String,
    pub created_at: Timestamp,
}

/// A file collected by an import, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedFile {
    pub path: String,
    pub content: String,
}
