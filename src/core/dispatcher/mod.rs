#![allow(clippy::result_large_err)]

//! Guarded commands over jobs, pipelines and templates.
//!
//! Commands run one at a time. Status transitions reach the service first and
//! are recorded locally once it accepts them. Edits and deletes apply the local
//! change first and put the previous values back if the service call fails.

use crate::core::composer::PipelineDraft;
use crate::core::entities::{FileDiff, FileHandle, Job, JobUpdate, NewJob, Pipeline, Template};
use crate::core::error::AppError;
use crate::core::job_store::{JobDraft, JobStore};
use crate::core::prompt::PromptBuilder;
use crate::core::service::{ArtifactStream, TransformationService};
use crate::core::template::{TemplateInstance, TemplateManager};
use crate::core::types::{JobStatus, PipelineStatus};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Whether the user confirmed a destructive command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl Confirmation {
    pub fn from_flag(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}

pub struct ActionDispatcher {
    store: Arc<JobStore>,
    service: Arc<dyn TransformationService>,
    action_lock: Mutex<()>,
}

impl ActionDispatcher {
    pub fn new(store: Arc<JobStore>, service: Arc<dyn TransformationService>) -> Self {
        ActionDispatcher {
            store,
            service,
            action_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Upload a bundle and register the resulting job as `Uploaded`.
    pub async fn submit(&self, request: NewJob) -> Result<Job, AppError> {
        let _guard = self.action_lock.lock().await;
        require_non_blank(&request.source_label, "source label")?;
        require_non_blank(&request.source_distribution, "source distribution")?;
        require_non_blank(&request.target_model, "target model")?;
        let metadata = tokio::fs::metadata(&request.source_bundle)
            .await
            .map_err(|e| {
                AppError::validation(format!(
                    "source bundle {} is not readable: {}",
                    request.source_bundle.display(),
                    e
                ))
            })?;
        if !metadata.is_file() {
            return Err(AppError::validation(format!(
                "source bundle {} must be a file",
                request.source_bundle.display()
            )));
        }

        let record = self.service.create(&request).await?;
        let mut draft = JobDraft::from(record);
        draft.source_label = request.source_label.trim().to_string();
        let job = self.store.create(draft).await?;
        info!(job_id = %job.id, label = %job.source_label, "job submitted");
        Ok(job)
    }

    pub async fn migrate(&self, id: &str) -> Result<Job, AppError> {
        let _guard = self.action_lock.lock().await;
        let job = self.store.get(id)?;
        if job.status == JobStatus::Migrating {
            return Err(reject("migrate", &job, "it is already migrating"));
        }
        self.transition(&job, JobStatus::Migrating, "migrate", |service, id| {
            Box::pin(async move { service.trigger(&id).await })
        })
        .await
    }

    pub async fn abort(&self, id: &str) -> Result<Job, AppError> {
        let _guard = self.action_lock.lock().await;
        let job = self.store.get(id)?;
        if job.status != JobStatus::Migrating {
            return Err(reject("abort", &job, "only migrating jobs can be aborted"));
        }
        self.transition(&job, JobStatus::Aborted, "abort", |service, id| {
            Box::pin(async move { service.abort(&id).await })
        })
        .await
    }

    /// Start a fresh attempt for an aborted or failed job.
    pub async fn rerun(&self, id: &str) -> Result<Job, AppError> {
        let _guard = self.action_lock.lock().await;
        let job = self.store.get(id)?;
        if !matches!(job.status, JobStatus::Aborted | JobStatus::Error) {
            return Err(reject(
                "rerun",
                &job,
                "only aborted or failed jobs can be rerun",
            ));
        }
        self.transition(&job, JobStatus::Migrating, "rerun", |service, id| {
            Box::pin(async move { service.trigger(&id).await })
        })
        .await
    }

    pub async fn delete(&self, id: &str, confirmation: Confirmation) -> Result<(), AppError> {
        let _guard = self.action_lock.lock().await;
        let job = self.store.get(id)?;
        if confirmation == Confirmation::Declined {
            return Err(reject("delete", &job, "deletion was not confirmed"));
        }
        self.store.delete(id).await?;
        if let Err(err) = self.service.delete(id).await {
            warn!(job_id = %id, error = %err, "remote delete failed; restoring job");
            self.store.restore(job).await?;
            return Err(err);
        }
        info!(job_id = %id, "job deleted");
        Ok(())
    }

    /// Change the distribution and/or model of a job.
    pub async fn edit(&self, id: &str, fields: JobUpdate) -> Result<Job, AppError> {
        let _guard = self.action_lock.lock().await;
        let fields = JobUpdate {
            source_distribution: fields.source_distribution.map(|d| d.trim().to_string()),
            target_model: fields.target_model.map(|m| m.trim().to_string()),
        };
        if fields.source_distribution.is_none() && fields.target_model.is_none() {
            return Err(AppError::validation("nothing to update"));
        }
        if let Some(distribution) = &fields.source_distribution {
            require_non_blank(distribution, "source distribution")?;
        }
        if let Some(model) = &fields.target_model {
            require_non_blank(model, "target model")?;
        }
        let previous = self.store.get(id)?;
        let updated = self
            .store
            .update(id, |job| {
                if let Some(distribution) = &fields.source_distribution {
                    job.source_distribution = distribution.clone();
                }
                if let Some(model) = &fields.target_model {
                    job.target_model = model.clone();
                }
            })
            .await?;
        if let Err(err) = self.service.update(id, &fields).await {
            warn!(job_id = %id, error = %err, "remote update failed; rolling back");
            self.store
                .update(id, |job| {
                    if job.source_distribution == updated.source_distribution {
                        job.source_distribution = previous.source_distribution.clone();
                    }
                    if job.target_model == updated.target_model {
                        job.target_model = previous.target_model.clone();
                    }
                })
                .await?;
            return Err(err);
        }
        Ok(updated)
    }

    pub async fn preview(&self, id: &str, path: &str) -> Result<FileDiff, AppError> {
        let _guard = self.action_lock.lock().await;
        let job = self.require_migrated(id, "preview")?;
        if path.trim().is_empty() {
            return Err(AppError::validation("preview needs a file path"));
        }
        self.service.fetch_diff(&job.id, path.trim()).await
    }

    /// Stream the migrated artifact into `dest_dir`; returns the written file.
    pub async fn download(&self, id: &str, dest_dir: &Path) -> Result<PathBuf, AppError> {
        let _guard = self.action_lock.lock().await;
        let job = self.require_migrated(id, "download")?;
        let stream = self.service.fetch_artifact(&job.id).await?;
        tokio::fs::create_dir_all(dest_dir).await?;
        let target = dest_dir.join(artifact_file_name(&job));
        write_artifact(stream, &target).await?;
        info!(job_id = %job.id, path = %target.display(), "artifact downloaded");
        Ok(target)
    }

    pub async fn generate_prompt(&self, id: &str) -> Result<String, AppError> {
        let _guard = self.action_lock.lock().await;
        let job = self.store.get(id)?;
        Ok(PromptBuilder::job_prompt(&job))
    }

    /// Compose and store a pipeline from finalized stages.
    pub async fn save_pipeline(
        &self,
        draft: PipelineDraft,
        name: &str,
    ) -> Result<Pipeline, AppError> {
        let _guard = self.action_lock.lock().await;
        let pipeline = draft.compose(&self.store.catalog(), name)?;
        let pipeline = self.store.insert_pipeline(pipeline).await?;
        info!(
            pipeline_id = %pipeline.id,
            stages = pipeline.stages.len(),
            total_files = pipeline.total_files,
            "pipeline saved"
        );
        Ok(pipeline)
    }

    pub async fn add_files(&self, id: &str, files: Vec<FileHandle>) -> Result<Pipeline, AppError> {
        let _guard = self.action_lock.lock().await;
        if files.is_empty() {
            return Err(AppError::validation("no files to add"));
        }
        let pipeline = self.store.get_pipeline(id)?;
        if pipeline.status != PipelineStatus::Running {
            return Err(reject_pipeline(
                "add files to",
                &pipeline,
                "it is not running",
            ));
        }
        let added: u64 = files.iter().map(|f| f.file_count).sum();
        self.store
            .update_pipeline(id, |p| {
                p.total_files += added;
                Ok(())
            })
            .await
    }

    pub async fn abort_pipeline(&self, id: &str) -> Result<Pipeline, AppError> {
        let _guard = self.action_lock.lock().await;
        let pipeline = self.store.get_pipeline(id)?;
        if pipeline.status != PipelineStatus::Running {
            return Err(reject_pipeline("abort", &pipeline, "it is not running"));
        }
        self.store
            .update_pipeline(id, |p| {
                p.status = PipelineStatus::Aborted;
                Ok(())
            })
            .await
    }

    /// Restart an aborted pipeline from zero progress.
    pub async fn rerun_pipeline(&self, id: &str) -> Result<Pipeline, AppError> {
        let _guard = self.action_lock.lock().await;
        let pipeline = self.store.get_pipeline(id)?;
        if pipeline.status != PipelineStatus::Aborted {
            return Err(reject_pipeline(
                "rerun",
                &pipeline,
                "only aborted pipelines can be rerun",
            ));
        }
        self.store
            .update_pipeline(id, |p| {
                p.migrated_files = 0;
                p.errors.clear();
                p.status = PipelineStatus::Running;
                Ok(())
            })
            .await
    }

    pub async fn remove_pipeline(
        &self,
        id: &str,
        confirmation: Confirmation,
    ) -> Result<(), AppError> {
        let _guard = self.action_lock.lock().await;
        let pipeline = self.store.get_pipeline(id)?;
        if confirmation == Confirmation::Declined {
            return Err(reject_pipeline(
                "remove",
                &pipeline,
                "removal was not confirmed",
            ));
        }
        self.store.remove_pipeline(id).await
    }

    pub async fn generate_pipeline_prompt(&self, id: &str) -> Result<String, AppError> {
        let _guard = self.action_lock.lock().await;
        let pipeline = self.store.get_pipeline(id)?;
        Ok(PromptBuilder::pipeline_prompt(
            &pipeline,
            &self.store.catalog(),
        ))
    }

    pub async fn save_as_template(&self, pipeline_id: &str, name: &str) -> Result<Template, AppError> {
        let _guard = self.action_lock.lock().await;
        let pipeline = self.store.get_pipeline(pipeline_id)?;
        let template = TemplateManager::extract_template(&pipeline, name)?;
        self.store.insert_template(template).await
    }

    pub async fn instantiate_template(&self, template_id: &str) -> Result<TemplateInstance, AppError> {
        let _guard = self.action_lock.lock().await;
        let template = self.store.get_template(template_id)?;
        TemplateManager::instantiate(&self.store.catalog(), &template)
    }

    pub async fn remove_template(
        &self,
        template_id: &str,
        confirmation: Confirmation,
    ) -> Result<(), AppError> {
        let _guard = self.action_lock.lock().await;
        let template = self.store.get_template(template_id)?;
        if confirmation == Confirmation::Declined {
            warn!(template_id = %template.id, "template removal was not confirmed");
            return Err(AppError::not_allowed(format!(
                "cannot remove template '{}': removal was not confirmed",
                template.name
            )));
        }
        self.store.remove_template(template_id).await
    }

    fn require_migrated(&self, id: &str, action: &str) -> Result<Job, AppError> {
        let job = self.store.get(id)?;
        if job.status != JobStatus::Migrated {
            return Err(reject(
                action,
                &job,
                "artifacts exist only once the job is migrated",
            ));
        }
        Ok(job)
    }

    /// Ask the service for the transition, then record `next` on the current
    /// local record. Nothing changes locally when the service refuses.
    async fn transition<F>(
        &self,
        job: &Job,
        next: JobStatus,
        action: &str,
        remote: F,
    ) -> Result<Job, AppError>
    where
        F: FnOnce(
            Arc<dyn TransformationService>,
            String,
        ) -> futures::future::BoxFuture<'static, Result<(), AppError>>,
    {
        if !job.status.can_transition_to(next) {
            return Err(reject(
                action,
                job,
                &format!("{} cannot move to {}", job.status, next),
            ));
        }
        if let Err(err) = remote(self.service.clone(), job.id.clone()).await {
            warn!(
                job_id = %job.id,
                action,
                error = %err,
                "remote call failed; job stays {}",
                job.status
            );
            return Err(err);
        }
        let updated = self.store.update(&job.id, |j| j.status = next).await?;
        info!(job_id = %job.id, action, status = %next, "job status changed");
        Ok(updated)
    }
}

fn reject(action: &str, job: &Job, reason: &str) -> AppError {
    warn!(job_id = %job.id, status = %job.status, action, "rejected: {}", reason);
    let mut error = AppError::not_allowed(format!(
        "cannot {} job '{}': {}",
        action, job.source_label, reason
    ));
    error.add_context("job_id", &job.id);
    error.add_context("status", job.status.as_str());
    error
}

fn reject_pipeline(action: &str, pipeline: &Pipeline, reason: &str) -> AppError {
    warn!(pipeline_id = %pipeline.id, status = %pipeline.status, action, "rejected: {}", reason);
    let mut error = AppError::not_allowed(format!(
        "cannot {} pipeline '{}': {}",
        action, pipeline.name, reason
    ));
    error.add_context("pipeline_id", &pipeline.id);
    error
}

fn require_non_blank(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{} must not be blank", field)));
    }
    Ok(())
}

/// `<label>-<distribution>-migrated.zip`, with path-hostile characters replaced.
pub fn artifact_file_name(job: &Job) -> String {
    format!(
        "{}-{}-migrated.zip",
        sanitize(&job.source_label),
        sanitize(&job.source_distribution)
    )
}

fn sanitize(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "job".to_string()
    } else {
        cleaned
    }
}

async fn write_artifact(mut stream: ArtifactStream, target: &Path) -> Result<(), AppError> {
    let partial = target.with_extension("zip.part");
    let result = async {
        let mut file = tokio::fs::File::create(&partial).await?;
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&partial, target).await?;
        Ok::<(), AppError>(())
    }
    .await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    result
}
