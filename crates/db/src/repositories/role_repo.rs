//! Role lookups and permission resolution.

use kublade_core::types::DbId;
use sqlx::PgPool;

use crate::models::role::Role;

const COLUMNS: &str = "id, name, description, permissions, created_at, updated_at";

/// Read access to the seeded roles.
pub struct RoleRepo;

impl RoleRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles WHERE id = $1");
        sqlx::query_as::<_, Role>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Exact, case-sensitive name match.
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles WHERE name = $1");
        sqlx::query_as::<_, Role>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles ORDER BY name ASC");
        sqlx::query_as::<_, Role>(&query).fetch_all(pool).await
    }

    /// Permissions granted by a role, or none when the user has no role.
    pub async fn permissions_for(
        pool: &PgPool,
        role_id: Option<DbId>,
    ) -> Result<Vec<String>, sqlx::Error> {
        let Some(role_id) = role_id else {
            return Ok(Vec::new());
        };
        Ok(Self::find_by_id(pool, role_id)
            .await?
            .map(|r| r.permissions)
            .unwrap_or_default())
    }
}
