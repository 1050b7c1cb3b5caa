//! Request middleware.
//!
//! - [`auth::authenticate`] validates the Bearer token and stores the
//!   [`auth::AuthUser`] principal in request extensions.
//! - [`permission::guarded`] wraps a route in the permission guard, which
//!   checks the principal against a permission template.

pub mod auth;
pub mod permission;
