//! Job handlers.

pub mod dispatcher;
pub mod git_import;

pub use dispatcher::{PgTemplateCatalog, TemplateCatalog, TemplateGitImportDispatcher};
pub use git_import::TemplateGitImport;
