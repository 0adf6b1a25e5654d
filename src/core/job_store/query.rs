use crate::core::entities::Job;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSortKey {
    Id,
    Label,
    Distribution,
    Model,
    #[default]
    CreatedAt,
    Status,
    FileCount,
}

impl FromStr for JobSortKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "id" => Ok(JobSortKey::Id),
            "label" | "name" => Ok(JobSortKey::Label),
            "distribution" => Ok(JobSortKey::Distribution),
            "model" => Ok(JobSortKey::Model),
            "created_at" | "date" | "created" => Ok(JobSortKey::CreatedAt),
            "status" => Ok(JobSortKey::Status),
            "file_count" | "files" => Ok(JobSortKey::FileCount),
            other => Err(format!("unknown sort key '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order '{}'", other)),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

/// Search and ordering over the job list. Newest first by default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobQuery {
    pub search: Option<String>,
    pub sort_by: JobSortKey,
    pub order: SortOrder,
}

impl JobQuery {
    pub fn matches(&self, job: &Job) -> bool {
        let Some(needle) = self.search.as_deref().map(str::trim) else {
            return true;
        };
        if needle.is_empty() {
            return true;
        }
        let needle = needle.to_lowercase();
        [
            job.source_label.as_str(),
            job.source_distribution.as_str(),
            job.target_model.as_str(),
            job.status.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }

    pub fn apply(&self, jobs: &[Job]) -> Vec<Job> {
        let mut result: Vec<Job> = jobs.iter().filter(|j| self.matches(j)).cloned().collect();
        result.sort_by(|a, b| {
            let ordering = self.compare(a, b);
            match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        result
    }

    fn compare(&self, a: &Job, b: &Job) -> Ordering {
        match self.sort_by {
            JobSortKey::Id => a.id.cmp(&b.id),
            JobSortKey::Label => a
                .source_label
                .to_lowercase()
                .cmp(&b.source_label.to_lowercase()),
            JobSortKey::Distribution => a.source_distribution.cmp(&b.source_distribution),
            JobSortKey::Model => a.target_model.cmp(&b.target_model),
            JobSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            JobSortKey::Status => a.status.as_str().cmp(b.status.as_str()),
            JobSortKey::FileCount => a.file_count.cmp(&b.file_count),
        }
    }
}
