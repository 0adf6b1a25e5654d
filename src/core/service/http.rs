use super::{ArtifactStream, ServiceError, TransformationService};
use crate::core::entities::{FileDiff, JobRecord, JobUpdate, NewJob};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use futures::StreamExt;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// ASCII set for encoding path segments (slashes included).
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS.add(b' ').add(b'/').add(b'?').add(b'#');

/// JSON-over-HTTP client for the transformation service.
#[derive(Clone)]
pub struct HttpTransformationService {
    http: reqwest::Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct CompareResponse {
    uploaded_content: String,
    migrated_content: String,
}

impl HttpTransformationService {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::new(
                    ErrorCategory::ConfigurationError,
                    format!("failed to build HTTP client: {}", e),
                )
            })?;
        Ok(HttpTransformationService { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> String {
        join_path(&self.base_url, segments)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ServiceError> {
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ServiceError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TransformationService for HttpTransformationService {
    async fn list(&self) -> Result<Vec<JobRecord>, AppError> {
        let url = self.endpoint(&["records"]);
        let records: Vec<JobRecord> = self.send_json(self.http.get(url)).await?;
        tracing::debug!("Fetched {} records from transformation service", records.len());
        Ok(records)
    }

    async fn create(&self, request: &NewJob) -> Result<JobRecord, AppError> {
        let bundle = tokio::fs::read(&request.source_bundle).await.map_err(|e| {
            AppError::validation(format!(
                "cannot read source bundle {}: {}",
                request.source_bundle.display(),
                e
            ))
        })?;
        let file_name = request
            .source_bundle
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{}.zip", request.source_label));
        let form = Form::new()
            .text("folder_name", request.source_label.clone())
            .text("distribution", request.source_distribution.clone())
            .text("model", request.target_model.clone())
            .part("file", Part::bytes(bundle).file_name(file_name));

        let url = self.endpoint(&["upload"]);
        let record: JobRecord = self.send_json(self.http.post(url).multipart(form)).await?;
        tracing::info!(job_id = %record.id, label = %record.source_label, "uploaded job bundle");
        Ok(record)
    }

    async fn trigger(&self, job_id: &str) -> Result<(), AppError> {
        let url = self.endpoint(&["migrate", &encode_segment(job_id)]);
        self.send(self.http.post(url)).await?;
        Ok(())
    }

    async fn abort(&self, job_id: &str) -> Result<(), AppError> {
        let url = self.endpoint(&["abort", &encode_segment(job_id)]);
        self.send(self.http.post(url)).await?;
        Ok(())
    }

    async fn fetch_artifact(&self, job_id: &str) -> Result<ArtifactStream, AppError> {
        let url = self.endpoint(&["download", &encode_segment(job_id)]);
        let response = self.send(self.http.get(url)).await?;
        let stream = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| AppError::from(ServiceError::Network(e.to_string())))
            })
            .boxed();
        Ok(stream)
    }

    async fn fetch_diff(&self, job_id: &str, path: &str) -> Result<FileDiff, AppError> {
        let url = self.endpoint(&["compare-files"]);
        let request = self
            .http
            .get(url)
            .query(&[("record_id", job_id), ("filename", path)]);
        let compare: CompareResponse = self.send_json(request).await?;
        Ok(FileDiff {
            path: path.to_string(),
            original: compare.uploaded_content,
            transformed: compare.migrated_content,
        })
    }

    async fn update(&self, job_id: &str, fields: &JobUpdate) -> Result<JobRecord, AppError> {
        let url = self.endpoint(&["records", &encode_segment(job_id)]);
        let record = self.send_json(self.http.put(url).json(fields)).await?;
        Ok(record)
    }

    async fn delete(&self, job_id: &str) -> Result<(), AppError> {
        let url = self.endpoint(&["records", &encode_segment(job_id)]);
        self.send(self.http.delete(url)).await?;
        Ok(())
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT_ENCODE_SET).to_string()
}

fn join_path(base: &Url, segments: &[&str]) -> String {
    let mut url = base.as_str().trim_end_matches('/').to_string();
    for segment in segments {
        if !segment.is_empty() {
            url.push('/');
            url.push_str(segment);
        }
    }
    url
}
