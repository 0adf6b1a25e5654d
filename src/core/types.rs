use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a migration job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Uploaded,
    Migrating,
    Migrated,
    Aborted,
    Error,
}

impl JobStatus {
    /// Canonical lowercase form used by the transformation service.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Uploaded => "uploaded",
            JobStatus::Migrating => "migrating",
            JobStatus::Migrated => "migrated",
            JobStatus::Aborted => "aborted",
            JobStatus::Error => "error",
        }
    }

    /// Parse a remote status string; anything unrecognised is treated as `Error`.
    pub fn from_remote(value: &str) -> Self {
        value.parse().unwrap_or(JobStatus::Error)
    }

    /// Returns `true` for states the migrate action cannot progress further.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Migrated | JobStatus::Aborted | JobStatus::Error
        )
    }

    /// Transition table for job status changes.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Uploaded, Migrating) | (Uploaded, Error) => true,
            (Migrating, Migrated) | (Migrating, Error) | (Migrating, Aborted) => true,
            // rerun / re-migrate of a finished attempt
            (Migrated, Migrating) | (Aborted, Migrating) | (Error, Migrating) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "uploaded" => Ok(JobStatus::Uploaded),
            "migrating" => Ok(JobStatus::Migrating),
            "migrated" => Ok(JobStatus::Migrated),
            "aborted" => Ok(JobStatus::Aborted),
            "error" | "failed" => Ok(JobStatus::Error),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

/// Pipeline status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    #[default]
    Running,
    Aborted,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStatus::Running => f.write_str("running"),
            PipelineStatus::Aborted => f.write_str("aborted"),
        }
    }
}

/// How a stage selects its input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSelectionKind {
    SingleFiles,
    Directory,
}

impl InputSelectionKind {
    pub const ALL: [InputSelectionKind; 2] =
        [InputSelectionKind::SingleFiles, InputSelectionKind::Directory];
}

impl fmt::Display for InputSelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSelectionKind::SingleFiles => f.write_str("files"),
            InputSelectionKind::Directory => f.write_str("directory"),
        }
    }
}

impl FromStr for InputSelectionKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "file" | "files" | "single_files" => Ok(InputSelectionKind::SingleFiles),
            "folder" | "dir" | "directory" => Ok(InputSelectionKind::Directory),
            other => Err(format!(
                "invalid input kind '{}'; supported values are files, directory",
                other
            )),
        }
    }
}

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    ValidationError,
    NotFound,
    RemoteError,
    ActionNotAllowed,
    PersistenceError,
    SerializationError,
    ConfigurationError,
    IoError,
    InternalError,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error severity enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Error,
    Warning,
    Info,
}
