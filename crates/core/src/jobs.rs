//! Job definitions for template git import.
//!
//! Two job types cooperate:
//!
//! - [`TEMPLATE_GIT_IMPORT_DISPATCHER`] runs on the `dispatchers` queue. It
//!   lists every template and enqueues one import per template. It carries the
//!   fixed unique key [`TEMPLATE_GIT_IMPORT_UNIQUE_KEY`], so however many
//!   triggers fire, at most one dispatcher is pending or running.
//! - [`TEMPLATE_GIT_IMPORT`] runs on the `git-import` queue, one per template,
//!   with no unique key.

use serde::{Deserialize, Serialize};

use crate::queue::NewJob;
use crate::types::DbId;

/// Queue for jobs that fan out other jobs.
pub const QUEUE_DISPATCHERS: &str = "dispatchers";

/// Queue for per-template git imports.
pub const QUEUE_GIT_IMPORT: &str = "git-import";

/// Queues a worker listens on by default, highest priority first.
pub const DEFAULT_WORKER_QUEUES: &[&str] = &[QUEUE_DISPATCHERS, QUEUE_GIT_IMPORT];

pub const TEMPLATE_GIT_IMPORT_DISPATCHER: &str = "template_git_import_dispatcher";
pub const TEMPLATE_GIT_IMPORT: &str = "template_git_import";

/// Constant, system-wide uniqueness key of the dispatcher job.
pub const TEMPLATE_GIT_IMPORT_UNIQUE_KEY: &str = "template-git-import";

/// Payload of a [`TEMPLATE_GIT_IMPORT`] job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateGitImportPayload {
    pub template_id: DbId,
}

/// Build the dispatcher job.
pub fn template_git_import_dispatcher() -> NewJob {
    NewJob::new(TEMPLATE_GIT_IMPORT_DISPATCHER, QUEUE_DISPATCHERS)
        .unique_by(TEMPLATE_GIT_IMPORT_UNIQUE_KEY)
        .with_tags(["dispatcher", TEMPLATE_GIT_IMPORT_UNIQUE_KEY])
}

/// Build the import job for one template.
pub fn template_git_import(template_id: DbId) -> NewJob {
    let payload = TemplateGitImportPayload { template_id };
    NewJob::new(TEMPLATE_GIT_IMPORT, QUEUE_GIT_IMPORT)
        .with_payload(serde_json::json!(payload))
        .with_tags(["template".to_string(), format!("template:{template_id}")])
}
