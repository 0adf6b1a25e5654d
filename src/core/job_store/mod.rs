#![allow(clippy::result_large_err)]

//! Authoritative local collection of jobs, pipelines, templates and the
//! option catalog. Every mutation is persisted before it returns.

pub mod query;

pub use query::{JobQuery, JobSortKey, SortOrder};

use crate::core::catalog::OptionCatalog;
use crate::core::entities::{Job, JobRecord, JobStatus, Pipeline, Template};
use crate::core::error::AppError;
use crate::core::persistence::PersistentStore;
use crate::utils::serialization::{JsonSerializer, Serializer};
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{broadcast, watch, Mutex};

pub const JOBS_KEY: &str = "jobs";
pub const PIPELINES_KEY: &str = "pipelines";
pub const TEMPLATES_KEY: &str = "templates";
pub const CATALOG_KEY: &str = "pipeline_options";

const EVENT_CAPACITY: usize = 64;

/// Change notifications published to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    JobsChanged,
    PipelinesChanged,
    TemplatesChanged,
    CatalogChanged,
}

impl StoreEvent {
    fn key(self) -> &'static str {
        match self {
            StoreEvent::JobsChanged => JOBS_KEY,
            StoreEvent::PipelinesChanged => PIPELINES_KEY,
            StoreEvent::TemplatesChanged => TEMPLATES_KEY,
            StoreEvent::CatalogChanged => CATALOG_KEY,
        }
    }
}

/// Fields needed to register a freshly submitted job.
#[derive(Debug, Clone)]
pub struct JobDraft {
    /// Identifier assigned by the transformation service, if any.
    pub id: Option<String>,
    pub source_label: String,
    pub source_distribution: String,
    pub target_model: String,
    pub file_count: u64,
}

impl From<JobRecord> for JobDraft {
    fn from(record: JobRecord) -> Self {
        JobDraft {
            id: Some(record.id),
            source_label: record.source_label,
            source_distribution: record.source_distribution,
            target_model: record.target_model,
            file_count: record.file_count,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    jobs: Vec<Job>,
    pipelines: Vec<Pipeline>,
    templates: Vec<Template>,
    catalog: OptionCatalog,
    /// Revision a pending mutation commits as.
    revision: u64,
    /// Revision of the last local write per job id. Remote data fetched
    /// before that revision must not overwrite the job.
    local_writes: HashMap<String, u64>,
}

impl StoreState {
    fn touch(&mut self, job_id: &str) {
        self.local_writes.insert(job_id.to_string(), self.revision);
    }
}

pub struct JobStore {
    state: RwLock<StoreState>,
    writer: Mutex<()>,
    persistence: Arc<dyn PersistentStore>,
    serializer: JsonSerializer,
    events: broadcast::Sender<StoreEvent>,
    revision: watch::Sender<u64>,
}

impl JobStore {
    /// Load persisted state. Unreadable or corrupt state is a fatal `PersistenceError`.
    pub async fn open(
        persistence: Arc<dyn PersistentStore>,
        default_catalog: OptionCatalog,
    ) -> Result<Self, AppError> {
        let serializer = JsonSerializer;
        let jobs = load_section(persistence.as_ref(), &serializer, JOBS_KEY)
            .await?
            .unwrap_or_default();
        let pipelines = load_section(persistence.as_ref(), &serializer, PIPELINES_KEY)
            .await?
            .unwrap_or_default();
        let templates = load_section(persistence.as_ref(), &serializer, TEMPLATES_KEY)
            .await?
            .unwrap_or_default();
        let catalog = load_section(persistence.as_ref(), &serializer, CATALOG_KEY)
            .await?
            .unwrap_or(default_catalog);

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (revision, _) = watch::channel(0);
        let state = StoreState {
            jobs,
            pipelines,
            templates,
            catalog,
            ..StoreState::default()
        };
        tracing::debug!(
            jobs = state.jobs.len(),
            pipelines = state.pipelines.len(),
            templates = state.templates.len(),
            "job store loaded"
        );
        Ok(JobStore {
            state: RwLock::new(state),
            writer: Mutex::new(()),
            persistence,
            serializer,
            events,
            revision,
        })
    }

    /// Subscribe to change events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Monotonic counter bumped on every successful mutation.
    pub fn watch_revision(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Current revision; pair it with a remote fetch for [`JobStore::reconcile_as_of`].
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn list(&self) -> Vec<Job> {
        self.read().jobs.clone()
    }

    pub fn query(&self, query: &JobQuery) -> Vec<Job> {
        query.apply(&self.read().jobs)
    }

    pub fn get(&self, id: &str) -> Result<Job, AppError> {
        self.read()
            .jobs
            .iter()
            .find(|job| job.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("job", id))
    }

    pub async fn create(&self, draft: JobDraft) -> Result<Job, AppError> {
        self.mutate(StoreEvent::JobsChanged, |state| {
            let id = draft
                .id
                .unwrap_or_else(|| crate::core::entities::new_id("job"));
            if state.jobs.iter().any(|job| job.id == id) {
                return Err(AppError::validation(format!("job '{}' already exists", id)));
            }
            let job = Job {
                id,
                source_label: draft.source_label,
                source_distribution: draft.source_distribution,
                target_model: draft.target_model,
                file_count: draft.file_count,
                status: JobStatus::Uploaded,
                created_at: Utc::now(),
            };
            state.touch(&job.id);
            state.jobs.push(job.clone());
            Ok(job)
        })
        .await
    }

    pub async fn replace(&self, id: &str, job: Job) -> Result<(), AppError> {
        if job.id != id {
            return Err(AppError::validation(format!(
                "cannot replace job '{}' with record '{}'",
                id, job.id
            )));
        }
        self.mutate(StoreEvent::JobsChanged, |state| {
            let slot = state
                .jobs
                .iter_mut()
                .find(|existing| existing.id == id)
                .ok_or_else(|| AppError::not_found("job", id))?;
            *slot = job;
            state.touch(id);
            Ok(())
        })
        .await
    }

    /// Read-modify-write against the current record.
    pub async fn update<F>(&self, id: &str, apply: F) -> Result<Job, AppError>
    where
        F: FnOnce(&mut Job) + Send,
    {
        self.mutate(StoreEvent::JobsChanged, |state| {
            let slot = state
                .jobs
                .iter_mut()
                .find(|existing| existing.id == id)
                .ok_or_else(|| AppError::not_found("job", id))?;
            apply(slot);
            slot.id = id.to_string();
            let updated = slot.clone();
            state.touch(id);
            Ok(updated)
        })
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.mutate(StoreEvent::JobsChanged, |state| {
            let before = state.jobs.len();
            state.jobs.retain(|job| job.id != id);
            if state.jobs.len() == before {
                return Err(AppError::not_found("job", id));
            }
            state.touch(id);
            Ok(())
        })
        .await
    }

    /// Put back a previously deleted record (rollback of a failed remote delete).
    pub async fn restore(&self, job: Job) -> Result<(), AppError> {
        self.mutate(StoreEvent::JobsChanged, |state| {
            if state.jobs.iter().any(|existing| existing.id == job.id) {
                return Ok(());
            }
            state.touch(&job.id);
            state.jobs.push(job);
            state.jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(())
        })
        .await
    }

    pub fn any_active(&self) -> bool {
        self.read()
            .jobs
            .iter()
            .any(|job| job.status == JobStatus::Migrating)
    }

    /// Overwrite `status` and `file_count` of local jobs with the remote values.
    /// Returns how many local records changed.
    pub async fn reconcile(&self, records: &[JobRecord]) -> Result<usize, AppError> {
        let as_of = self.revision();
        self.reconcile_as_of(records, as_of).await
    }

    /// Like [`JobStore::reconcile`] for records fetched while the store was at
    /// revision `as_of`. Jobs written locally after `as_of` keep their local
    /// values; the next fetch covers them.
    pub async fn reconcile_as_of(
        &self,
        records: &[JobRecord],
        as_of: u64,
    ) -> Result<usize, AppError> {
        let pending = {
            let state = self.read();
            records
                .iter()
                .filter(|record| remote_applies(&state, record, as_of))
                .count()
        };
        if pending == 0 {
            return Ok(0);
        }

        self.mutate(StoreEvent::JobsChanged, |state| {
            let mut applied = 0;
            for record in records {
                if !remote_applies(state, record, as_of) {
                    continue;
                }
                if let Some(job) = state.jobs.iter_mut().find(|job| job.id == record.id) {
                    let status = record.job_status();
                    tracing::debug!(
                        job_id = %job.id,
                        from = %job.status,
                        to = %status,
                        "reconciled job from remote"
                    );
                    job.status = status;
                    job.file_count = record.file_count;
                    applied += 1;
                }
            }
            state.local_writes.retain(|_, written| *written > as_of);
            Ok(applied)
        })
        .await
    }

    pub fn list_pipelines(&self) -> Vec<Pipeline> {
        self.read().pipelines.clone()
    }

    pub fn get_pipeline(&self, id: &str) -> Result<Pipeline, AppError> {
        self.read()
            .pipelines
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("pipeline", id))
    }

    pub async fn insert_pipeline(&self, pipeline: Pipeline) -> Result<Pipeline, AppError> {
        self.mutate(StoreEvent::PipelinesChanged, |state| {
            if state.pipelines.iter().any(|p| p.id == pipeline.id) {
                return Err(AppError::validation(format!(
                    "pipeline '{}' already exists",
                    pipeline.id
                )));
            }
            state.pipelines.push(pipeline.clone());
            Ok(pipeline)
        })
        .await
    }

    pub async fn update_pipeline<F>(&self, id: &str, apply: F) -> Result<Pipeline, AppError>
    where
        F: FnOnce(&mut Pipeline) -> Result<(), AppError> + Send,
    {
        self.mutate(StoreEvent::PipelinesChanged, |state| {
            let slot = state
                .pipelines
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| AppError::not_found("pipeline", id))?;
            apply(slot)?;
            if slot.migrated_files > slot.total_files {
                return Err(AppError::validation(format!(
                    "pipeline '{}' would report more migrated than total files",
                    id
                )));
            }
            Ok(slot.clone())
        })
        .await
    }

    pub async fn remove_pipeline(&self, id: &str) -> Result<(), AppError> {
        self.mutate(StoreEvent::PipelinesChanged, |state| {
            let before = state.pipelines.len();
            state.pipelines.retain(|p| p.id != id);
            if state.pipelines.len() == before {
                return Err(AppError::not_found("pipeline", id));
            }
            Ok(())
        })
        .await
    }

    pub fn list_templates(&self) -> Vec<Template> {
        self.read().templates.clone()
    }

    pub fn get_template(&self, id: &str) -> Result<Template, AppError> {
        self.read()
            .templates
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("template", id))
    }

    pub async fn insert_template(&self, template: Template) -> Result<Template, AppError> {
        self.mutate(StoreEvent::TemplatesChanged, |state| {
            state.templates.push(template.clone());
            Ok(template)
        })
        .await
    }

    pub async fn remove_template(&self, id: &str) -> Result<(), AppError> {
        self.mutate(StoreEvent::TemplatesChanged, |state| {
            let before = state.templates.len();
            state.templates.retain(|t| t.id != id);
            if state.templates.len() == before {
                return Err(AppError::not_found("template", id));
            }
            Ok(())
        })
        .await
    }

    pub fn catalog(&self) -> OptionCatalog {
        self.read().catalog.clone()
    }

    /// Apply a catalog edit; the result must still be a consistent graph.
    pub async fn update_catalog<F, R>(&self, apply: F) -> Result<R, AppError>
    where
        F: FnOnce(&mut OptionCatalog) -> Result<R, AppError> + Send,
        R: Send,
    {
        self.mutate(StoreEvent::CatalogChanged, |state| {
            let result = apply(&mut state.catalog)?;
            state.catalog.validate()?;
            Ok(result)
        })
        .await
    }

    /// Apply `apply` to a copy of the state, persist the touched section and
    /// only then publish the copy. Writers queue on `writer`; readers keep
    /// seeing the previous state until the save has finished.
    async fn mutate<R, F>(&self, event: StoreEvent, apply: F) -> Result<R, AppError>
    where
        F: FnOnce(&mut StoreState) -> Result<R, AppError> + Send,
        R: Send,
    {
        let _writer = self.writer.lock().await;
        let mut next = self.read().clone();
        next.revision = self.revision() + 1;
        let result = apply(&mut next)?;

        let bytes = self.encode(&next, event)?;
        if let Err(err) = self.persistence.save(event.key(), &bytes).await {
            tracing::error!(key = event.key(), error = %err, "persisting store failed; change discarded");
            return Err(err);
        }
        *self.write() = next;

        self.revision.send_modify(|revision| *revision += 1);
        let _ = self.events.send(event);
        Ok(result)
    }

    fn encode(&self, state: &StoreState, event: StoreEvent) -> Result<Vec<u8>, AppError> {
        match event {
            StoreEvent::JobsChanged => self.serializer.serialize(&state.jobs),
            StoreEvent::PipelinesChanged => self.serializer.serialize(&state.pipelines),
            StoreEvent::TemplatesChanged => self.serializer.serialize(&state.templates),
            StoreEvent::CatalogChanged => self.serializer.serialize(&state.catalog),
        }
        .map_err(|e| AppError::persistence(format!("failed to serialize {}: {}", event.key(), e)))
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn remote_applies(state: &StoreState, record: &JobRecord, as_of: u64) -> bool {
    if state
        .local_writes
        .get(&record.id)
        .is_some_and(|written| *written > as_of)
    {
        return false;
    }
    state.jobs.iter().any(|job| {
        job.id == record.id
            && (job.status != record.job_status() || job.file_count != record.file_count)
    })
}

async fn load_section<T: DeserializeOwned>(
    persistence: &dyn PersistentStore,
    serializer: &JsonSerializer,
    key: &str,
) -> Result<Option<T>, AppError> {
    let Some(bytes) = persistence.load(key).await? else {
        return Ok(None);
    };
    serializer.deserialize(&bytes).map(Some).map_err(|e| {
        AppError::persistence(format!("persisted '{}' is unreadable: {}", key, e))
            .with_context(key)
    })
}
