//! HTTP handlers, one module per resource.

pub mod ai_chat_messages;
pub mod auth;
pub mod projects;
pub mod queue;
pub mod templates;
pub mod users;
