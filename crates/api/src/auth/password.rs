//! Password storage with Argon2id.
//!
//! Stored hashes are PHC strings, so salt and cost parameters travel with
//! each hash and old hashes keep verifying after the defaults change.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::{AppError, AppResult};

pub fn hash_password(plain: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))
}

/// `Ok(false)` for a wrong password; an error means the stored hash is
/// unreadable.
pub fn check_password(plain: &str, stored: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| AppError::InternalError(format!("Stored password hash is invalid: {e}")))?;

    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::InternalError(format!(
            "Password verification failed: {e}"
        ))),
    }
}

/// Spend the cost of one verification without an account, so an unknown
/// email answers as slowly as a wrong password.
pub fn equalize_timing(plain: &str) {
    static DECOY: OnceLock<Option<String>> = OnceLock::new();

    let decoy = DECOY.get_or_init(|| hash_password("kublade-decoy-password").ok());
    if let Some(stored) = decoy {
        let _ = check_password(plain, stored);
    }
}
