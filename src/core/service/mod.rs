#![allow(clippy::result_large_err)]

//! Transformation service contract and its HTTP binding.

pub mod http;

pub use http::HttpTransformationService;

use crate::core::entities::{FileDiff, JobRecord, JobUpdate, NewJob};
use crate::core::error::AppError;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Chunks of a downloaded migration artifact.
pub type ArtifactStream = BoxStream<'static, Result<Vec<u8>, AppError>>;

/// Remote service that owns the actual transformation work.
#[async_trait]
pub trait TransformationService: Send + Sync {
    async fn list(&self) -> Result<Vec<JobRecord>, AppError>;
    async fn create(&self, request: &NewJob) -> Result<JobRecord, AppError>;
    /// Start migration of an uploaded job.
    async fn trigger(&self, job_id: &str) -> Result<(), AppError>;
    async fn abort(&self, job_id: &str) -> Result<(), AppError>;
    async fn fetch_artifact(&self, job_id: &str) -> Result<ArtifactStream, AppError>;
    async fn fetch_diff(&self, job_id: &str, path: &str) -> Result<FileDiff, AppError>;
    async fn update(&self, job_id: &str, fields: &JobUpdate) -> Result<JobRecord, AppError>;
    async fn delete(&self, job_id: &str) -> Result<(), AppError>;
}

/// Failures talking to the transformation service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let mut error = AppError::remote(err.to_string());
        if let ServiceError::Status { status, .. } = &err {
            error.add_context("status", &status.to_string());
        }
        error
    }
}
