//! Projects: a named deployment target bound to one namespace.

use kublade_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    /// Creator; `None` once the creating user is removed.
    pub user_id: Option<DbId>,
    pub name: String,
    /// Kubernetes namespace the project deploys into.
    pub namespace: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub namespace: String,
}

/// Partial update; omitted fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub namespace: Option<String>,
}
