use futures::StreamExt;
use migrator::core::entities::{JobUpdate, NewJob};
use migrator::core::service::{HttpTransformationService, TransformationService};
use migrator::core::types::{ErrorCategory, JobStatus};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client(server: &MockServer) -> HttpTransformationService {
    HttpTransformationService::new(Url::parse(&server.uri()).unwrap(), Duration::from_secs(5))
        .unwrap()
}

fn remote_record(id: u64, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "folder_name": "orders",
        "kafka_distribution": "Apache Kafka",
        "llm_model": "GPT-4",
        "file_count": 3,
        "status": status,
        "date_time": "2026-01-05T10:00:00Z"
    })
}

#[tokio::test]
async fn test_list_accepts_service_field_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            remote_record(7, "Migrating"),
            remote_record(8, "done-ish")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let records = client(&server).await.list().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "7");
    assert_eq!(records[0].source_label, "orders");
    assert_eq!(records[0].source_distribution, "Apache Kafka");
    assert_eq!(records[0].target_model, "GPT-4");
    assert_eq!(records[0].file_count, 3);
    assert_eq!(records[0].job_status(), JobStatus::Migrating);
    assert_eq!(records[1].job_status(), JobStatus::Error);
}

#[tokio::test]
async fn test_create_uploads_bundle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_record(12, "uploaded")))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let bundle = tmp.path().join("orders.zip");
    std::fs::write(&bundle, b"PK\x03\x04").unwrap();

    let record = client(&server)
        .await
        .create(&NewJob {
            source_label: "orders".to_string(),
            source_distribution: "Apache Kafka".to_string(),
            target_model: "GPT-4".to_string(),
            source_bundle: bundle,
        })
        .await
        .unwrap();
    assert_eq!(record.id, "12");

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"folder_name\""));
    assert!(body.contains("name=\"distribution\""));
    assert!(body.contains("name=\"model\""));
    assert!(body.contains("filename=\"orders.zip\""));
}

#[tokio::test]
async fn test_create_with_missing_bundle_is_validation_error() {
    let server = MockServer::start().await;
    let err = client(&server)
        .await
        .create(&NewJob {
            source_label: "orders".to_string(),
            source_distribution: "Apache Kafka".to_string(),
            target_model: "GPT-4".to_string(),
            source_bundle: "/nonexistent/orders.zip".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::ValidationError);
}

#[tokio::test]
async fn test_trigger_and_abort_post_to_job_paths() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/migrate/7"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/abort/7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = client(&server).await;
    service.trigger("7").await.unwrap();
    service.abort("7").await.unwrap();
}

#[tokio::test]
async fn test_error_status_becomes_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/migrate/7"))
        .respond_with(ResponseTemplate::new(500).set_body_string("worker crashed"))
        .mount(&server)
        .await;

    let err = client(&server).await.trigger("7").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::RemoteError);
    assert_eq!(err.context.get("status").map(String::as_str), Some("500"));
    assert!(err.message.contains("worker crashed"));
}

#[tokio::test]
async fn test_unreachable_service_is_remote_error() {
    let service = HttpTransformationService::new(
        Url::parse("http://127.0.0.1:9").unwrap(),
        Duration::from_secs(1),
    )
    .unwrap();
    let err = service.list().await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::RemoteError);
}

#[tokio::test]
async fn test_fetch_diff_queries_by_record_and_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/compare-files"))
        .and(query_param("record_id", "7"))
        .and(query_param("filename", "src/App.java"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uploaded_content": "kafka.consumer()",
            "migrated_content": "confluent.consumer()"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let diff = client(&server)
        .await
        .fetch_diff("7", "src/App.java")
        .await
        .unwrap();
    assert_eq!(diff.path, "src/App.java");
    assert_eq!(diff.original, "kafka.consumer()");
    assert_eq!(diff.transformed, "confluent.consumer()");
}

#[tokio::test]
async fn test_update_sends_only_changed_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/records/7"))
        .and(body_json(json!({ "target_model": "Gemini Pro" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_record(7, "uploaded")))
        .expect(1)
        .mount(&server)
        .await;

    let record = client(&server)
        .await
        .update(
            "7",
            &JobUpdate {
                source_distribution: None,
                target_model: Some("Gemini Pro".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(record.id, "7");
}

#[tokio::test]
async fn test_delete_and_download() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/records/7"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download/7"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04zip".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let service = client(&server).await;
    let mut stream = service.fetch_artifact("7").await.unwrap();
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        bytes.extend(chunk.unwrap());
    }
    assert_eq!(bytes, b"PK\x03\x04zip");

    service.delete("7").await.unwrap();
}
