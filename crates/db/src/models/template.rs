//! Template entity model and DTOs.

use kublade_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Template {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub name: String,
    /// Whether deployments of this template get a generated network policy.
    pub netpol: bool,
    /// Source repository; templates without one are never imported.
    pub git_url: Option<String>,
    pub git_branch: Option<String>,
    /// Sub-directory inside the repository, relative to its root.
    pub git_path: Option<String>,
    pub last_imported_at: Option<Timestamp>,
    pub last_import_commit: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplate {
    pub name: String,
    #[serde(default)]
    pub netpol: bool,
    pub git_url: Option<String>,
    pub git_branch: Option<String>,
    pub git_path: Option<String>,
}

/// Partial update; omitted fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTemplate {
    pub name: Option<String>,
    pub netpol: Option<bool>,
    pub git_url: Option<String>,
    pub git_branch: Option<String>,
    pub git_path: Option<String>,
}
