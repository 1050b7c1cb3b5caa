//! Import one template's files from its git repository.

use anyhow::Context;
use async_trait::async_trait;
use kublade_core::jobs::{TemplateGitImportPayload, TEMPLATE_GIT_IMPORT};
use kublade_core::queue::QueuedJob;
use kublade_core::validation::{normalize_git_path, DEFAULT_GIT_BRANCH};
use kublade_db::repositories::{TemplateFileRepo, TemplateRepo};
use serde_json::json;
use sqlx::PgPool;

use crate::git::{collect_files, GitClient};
use crate::runner::JobHandler;

pub struct TemplateGitImport {
    pool: PgPool,
    git: GitClient,
}

impl TemplateGitImport {
    pub fn new(pool: PgPool, git: GitClient) -> Self {
        Self { pool, git }
    }
}

fn skipped(reason: &str) -> serde_json::Value {
    json!({ "skipped": true, "reason": reason })
}

#[async_trait]
impl JobHandler for TemplateGitImport {
    fn job_type(&self) -> &'static str {
        TEMPLATE_GIT_IMPORT
    }

    async fn handle(&self, job: &QueuedJob) -> anyhow::Result<serde_json::Value> {
        let payload: TemplateGitImportPayload = serde_json::from_value(job.payload.clone())
            .context("invalid template_git_import payload")?;

        let Some(template) = TemplateRepo::find_by_id(&self.pool, payload.template_id).await? else {
            tracing::info!(template_id = %payload.template_id, "Template gone, import skipped");
            return Ok(skipped("template deleted"));
        };

        let Some(url) = template.git_url.as_deref().filter(|u| !u.trim().is_empty()) else {
            tracing::debug!(template_id = %template.id, "Template has no git_url, import skipped");
            return Ok(skipped("no git_url"));
        };
        let branch = template
            .git_branch
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or(DEFAULT_GIT_BRANCH);
        let sub_path = normalize_git_path(template.git_path.as_deref().unwrap_or(""))?;

        let checkout = tempfile::tempdir().context("failed to create checkout directory")?;
        let repo = checkout.path().join("repo");

        self.git
            .shallow_clone(url, branch, &repo)
            .await
            .with_context(|| format!("failed to clone {url} at branch {branch}"))?;
        let commit = self.git.head_commit(&repo).await?;

        let files = tokio::task::spawn_blocking(move || collect_files(&repo, &sub_path))
            .await
            .context("file collection task failed")??;

        let stored =
            TemplateFileRepo::replace_all(&self.pool, template.id, &files, Some(&commit)).await?;
        if !stored {
            tracing::info!(template_id = %template.id, "Template deleted during import, files discarded");
            return Ok(skipped("template deleted during import"));
        }

        tracing::info!(
            template_id = %template.id,
            files = files.len(),
            commit = %commit,
            "Template imported"
        );
        Ok(json!({ "template_id": template.id, "files": files.len(), "commit": commit }))
    }
}
