//! Credentials: password hashing and the tokens issued at login.

pub mod password;
pub mod tokens;
