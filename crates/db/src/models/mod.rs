//! Row types read with `FromRow`, plus the insert and patch inputs the
//! repositories accept.

pub mod ai_chat_message;
pub mod job;
pub mod project;
pub mod queue_worker;
pub mod role;
pub mod session;
pub mod status;
pub mod template;
pub mod template_file;
pub mod user;
