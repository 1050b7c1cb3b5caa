//! Users, their stored credentials, and the safe public view.

use kublade_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Includes the password hash; never serialise this directly.
///
/// Contains the password hash. Use [`UserResponse`] for anything leaving the server.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: Option<DbId>,
    /// Direct grants, unioned with the role's at token issue time.
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// Safe user representation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub role_id: Option<DbId>,
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role_id: user.role_id,
            permissions: user.permissions,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// DTO for creating a new user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: Option<DbId>,
    pub permissions: Vec<String>,
}

/// Partial update; a `Some` password is already hashed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Already hashed; the API hashes a plaintext `password` before building this.
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub role_id: Option<DbId>,
    pub permissions: Option<Vec<String>>,
    pub is_active: Option<bool>,
}
