//! Domain error type shared by every Kublade crate.

use crate::types::DbId;

/// Errors raised by domain rules and repositories.
///
/// The API layer maps each variant onto an HTTP status and the standard
/// response envelope; the worker logs them and fails the job.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A live (not soft-deleted) entity with this id does not exist.
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// Input failed a domain validation rule.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A uniqueness rule was violated (email, namespace, ...).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No authenticated principal, or the principal lacks every required permission.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The principal is known but the action is refused (inactive account).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for [`CoreError::NotFound`].
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        CoreError::NotFound { entity, id }
    }
}
