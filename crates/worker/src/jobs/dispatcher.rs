//! The template git import dispatcher.
//!
//! Fans out one `template_git_import` job per live template. The dispatcher
//! itself is a unique job, so this runs at most once at a time however often
//! it is triggered.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use kublade_core::jobs::{self, TEMPLATE_GIT_IMPORT_DISPATCHER};
use kublade_core::queue::{EnqueueOutcome, JobQueue, QueuedJob};
use kublade_core::types::DbId;
use kublade_db::repositories::TemplateRepo;
use serde_json::json;
use sqlx::PgPool;

use crate::runner::JobHandler;

/// Source of the templates to import.
#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    /// IDs of every live template.
    async fn template_ids(&self) -> anyhow::Result<Vec<DbId>>;
}

pub struct PgTemplateCatalog {
    pool: PgPool,
}

impl PgTemplateCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateCatalog for PgTemplateCatalog {
    async fn template_ids(&self) -> anyhow::Result<Vec<DbId>> {
        TemplateRepo::list_ids(&self.pool)
            .await
            .context("failed to list templates")
    }
}

pub struct TemplateGitImportDispatcher {
    catalog: Arc<dyn TemplateCatalog>,
    queue: Arc<dyn JobQueue>,
}

impl TemplateGitImportDispatcher {
    pub fn new(catalog: Arc<dyn TemplateCatalog>, queue: Arc<dyn JobQueue>) -> Self {
        Self { catalog, queue }
    }
}

#[async_trait]
impl JobHandler for TemplateGitImportDispatcher {
    fn job_type(&self) -> &'static str {
        TEMPLATE_GIT_IMPORT_DISPATCHER
    }

    async fn handle(&self, _job: &QueuedJob) -> anyhow::Result<serde_json::Value> {
        let template_ids = self.catalog.template_ids().await?;

        let mut enqueued = 0usize;
        for template_id in &template_ids {
            let outcome = self
                .queue
                .enqueue(jobs::template_git_import(*template_id))
                .await
                .with_context(|| format!("failed to enqueue import of template {template_id}"))?;
            if let EnqueueOutcome::Enqueued(job_id) = outcome {
                tracing::debug!(template_id = %template_id, job_id = %job_id, "Template import enqueued");
                enqueued += 1;
            }
        }

        tracing::info!(templates = template_ids.len(), enqueued, "Template imports dispatched");
        Ok(json!({ "templates": template_ids.len(), "enqueued": enqueued }))
    }
}
