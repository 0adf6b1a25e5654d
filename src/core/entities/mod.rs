use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::error::AppError;
pub use crate::core::types::{InputSelectionKind, JobStatus, PipelineStatus};

/// A single migration unit tracked from submission through completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub source_label: String,
    pub source_distribution: String,
    pub target_model: String,
    pub file_count: u64,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

/// Submission request for a new job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub source_label: String,
    pub source_distribution: String,
    pub target_model: String,
    /// Archive (or directory) uploaded to the transformation service.
    pub source_bundle: PathBuf,
}

impl NewJob {
    /// Derive the label from the bundle file name, dropping a trailing `.zip`.
    pub fn label_from_bundle(bundle: &Path) -> Option<String> {
        let name = bundle.file_name()?.to_string_lossy().to_string();
        let trimmed = name
            .strip_suffix(".zip")
            .or_else(|| name.strip_suffix(".ZIP"))
            .unwrap_or(&name);
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Record shape reported by the transformation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(alias = "folder_name")]
    pub source_label: String,
    #[serde(alias = "kafka_distribution", default)]
    pub source_distribution: String,
    #[serde(alias = "llm_model", default)]
    pub target_model: String,
    #[serde(default)]
    pub file_count: u64,
    pub status: String,
    #[serde(alias = "date_time", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn job_status(&self) -> JobStatus {
        JobStatus::from_remote(&self.status)
    }
}

impl From<JobRecord> for Job {
    fn from(record: JobRecord) -> Self {
        let status = record.job_status();
        Job {
            id: record.id,
            source_label: record.source_label,
            source_distribution: record.source_distribution,
            target_model: record.target_model,
            file_count: record.file_count,
            status,
            created_at: record.created_at,
        }
    }
}

/// Locally editable job fields pushed to the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_distribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_model: Option<String>,
}

/// Original and transformed content of one file of a migrated job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDiff {
    pub path: String,
    #[serde(alias = "uploaded_content")]
    pub original: String,
    #[serde(alias = "migrated_content")]
    pub transformed: String,
}

/// A file or directory bound to a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    #[serde(default)]
    pub size_bytes: u64,
    /// Regular files represented by this handle: 1 for a file, the contents for a directory.
    #[serde(default = "one")]
    pub file_count: u64,
}

fn one() -> u64 {
    1
}

impl FileHandle {
    pub fn file<P: Into<PathBuf>>(path: P) -> Self {
        Self::build(path.into(), false, 0, 1)
    }

    pub fn directory<P: Into<PathBuf>>(path: P, file_count: u64) -> Self {
        Self::build(path.into(), true, 0, file_count)
    }

    /// Inspect the file system to build a handle; directories are walked recursively.
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            AppError::validation(format!("cannot read {}: {}", path.display(), e))
        })?;
        if metadata.is_dir() {
            let (count, size) = walk_dir(path)?;
            Ok(Self::build(path.to_path_buf(), true, size, count))
        } else {
            Ok(Self::build(path.to_path_buf(), false, metadata.len(), 1))
        }
    }

    fn build(path: PathBuf, is_dir: bool, size_bytes: u64, file_count: u64) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        FileHandle {
            name,
            path,
            is_dir,
            size_bytes,
            file_count,
        }
    }
}

fn walk_dir(root: &Path) -> Result<(u64, u64), AppError> {
    let mut count = 0;
    let mut size = 0;
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            AppError::validation(format!("cannot list {}: {}", dir.display(), e))
        })?;
        for entry in entries {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_dir() {
                pending.push(entry.path());
            } else if metadata.is_file() {
                count += 1;
                size += metadata.len();
            }
        }
    }
    Ok((count, size))
}

/// One configured step of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub objective: String,
    pub platform: String,
    pub model: String,
    pub input_selection_kind: InputSelectionKind,
    pub bound_files: Vec<FileHandle>,
}

impl Stage {
    pub fn file_count(&self) -> u64 {
        self.bound_files.iter().map(|f| f.file_count).sum()
    }

    pub fn skeleton(&self) -> StageSkeleton {
        StageSkeleton {
            objective: self.objective.clone(),
            platform: self.platform.clone(),
            model: self.model.clone(),
        }
    }
}

/// Named, ordered set of stages with aggregate progress counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: String,
    pub name: String,
    pub stages: Vec<Stage>,
    pub total_files: u64,
    pub migrated_files: u64,
    pub status: PipelineStatus,
    #[serde(default)]
    pub errors: String,
    pub created_at: DateTime<Utc>,
}

impl Pipeline {
    pub fn progress_percent(&self) -> f64 {
        if self.total_files == 0 {
            return 0.0;
        }
        (self.migrated_files as f64 / self.total_files as f64) * 100.0
    }
}

/// Stage shape without file bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSkeleton {
    pub objective: String,
    pub platform: String,
    pub model: String,
}

/// Reusable stage-shape skeleton derived from a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub stage_skeletons: Vec<StageSkeleton>,
    pub created_at: DateTime<Utc>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

pub(crate) fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}
