//! One zero-sized repository per table; every method takes the pool.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod ai_chat_message_repo;
pub mod job_repo;
pub mod project_repo;
pub mod role_repo;
pub mod session_repo;
pub mod template_file_repo;
pub mod template_repo;
pub mod user_repo;
pub mod worker_repo;

pub use ai_chat_message_repo::AiChatMessageRepo;
pub use job_repo::JobRepo;
pub use project_repo::ProjectRepo;
pub use role_repo::RoleRepo;
pub use session_repo::SessionRepo;
pub use template_file_repo::TemplateFileRepo;
pub use template_repo::TemplateRepo;
pub use user_repo::UserRepo;
pub use worker_repo::WorkerRepo;
