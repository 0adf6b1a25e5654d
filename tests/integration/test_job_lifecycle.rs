#[path = "../common/mod.rs"]
mod common;

use common::{record, FakeService};
use migrator::core::dispatcher::{artifact_file_name, ActionDispatcher, Confirmation};
use migrator::core::entities::{JobUpdate, NewJob};
use migrator::core::job_store::{JobDraft, JobStore, StoreEvent};
use migrator::core::persistence::{MemoryStore, PersistentStore};
use migrator::core::service::TransformationService;
use migrator::core::types::{ErrorCategory, JobStatus};
use migrator::core::OptionCatalog;
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    store: Arc<JobStore>,
    service: Arc<FakeService>,
    persistence: Arc<MemoryStore>,
    dispatcher: ActionDispatcher,
}

async fn harness() -> Harness {
    let persistence = Arc::new(MemoryStore::new());
    let store = Arc::new(
        JobStore::open(
            persistence.clone() as Arc<dyn PersistentStore>,
            OptionCatalog::builtin(),
        )
        .await
        .unwrap(),
    );
    let service = Arc::new(FakeService::new());
    let dispatcher = ActionDispatcher::new(store.clone(), service.clone());
    Harness {
        store,
        service,
        persistence,
        dispatcher,
    }
}

/// Register a job both remotely and locally with the given status.
async fn seed(h: &Harness, id: &str, status: JobStatus) {
    h.service.push_record(record(id, "orders", status.as_str()));
    h.store
        .create(JobDraft::from(record(id, "orders", "uploaded")))
        .await
        .unwrap();
    h.store
        .update(id, |job| job.status = status)
        .await
        .unwrap();
}

fn bundle(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("orders.zip");
    std::fs::write(&path, b"PK\x03\x04").unwrap();
    path
}

#[tokio::test]
async fn test_submit_registers_uploaded_job() {
    let h = harness().await;
    let tmp = TempDir::new().unwrap();
    let mut events = h.store.subscribe();

    let job = h
        .dispatcher
        .submit(NewJob {
            source_label: "orders".to_string(),
            source_distribution: "Apache Kafka".to_string(),
            target_model: "GPT-4".to_string(),
            source_bundle: bundle(&tmp),
        })
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Uploaded);
    assert_eq!(h.store.get(&job.id).unwrap(), job);
    assert_eq!(events.try_recv().unwrap(), StoreEvent::JobsChanged);
    assert!(h.persistence.raw("jobs").is_some());
}

#[tokio::test]
async fn test_submit_rejects_blank_fields_without_calling_service() {
    let h = harness().await;
    let tmp = TempDir::new().unwrap();
    let err = h
        .dispatcher
        .submit(NewJob {
            source_label: "orders".to_string(),
            source_distribution: "  ".to_string(),
            target_model: "GPT-4".to_string(),
            source_bundle: bundle(&tmp),
        })
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::ValidationError);
    assert!(h.service.calls().is_empty());
    assert!(h.store.list().is_empty());
}

#[tokio::test]
async fn test_submit_failure_leaves_store_untouched() {
    let h = harness().await;
    let tmp = TempDir::new().unwrap();
    h.service.set_failing(true);
    let err = h
        .dispatcher
        .submit(NewJob {
            source_label: "orders".to_string(),
            source_distribution: "Apache Kafka".to_string(),
            target_model: "GPT-4".to_string(),
            source_bundle: bundle(&tmp),
        })
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::RemoteError);
    assert!(h.store.list().is_empty());
}

#[tokio::test]
async fn test_migrate_then_abort_then_rerun() {
    let h = harness().await;
    seed(&h, "1", JobStatus::Uploaded).await;

    let job = h.dispatcher.migrate("1").await.unwrap();
    assert_eq!(job.status, JobStatus::Migrating);
    assert!(h.store.any_active());

    let job = h.dispatcher.abort("1").await.unwrap();
    assert_eq!(job.status, JobStatus::Aborted);

    let job = h.dispatcher.rerun("1").await.unwrap();
    assert_eq!(job.status, JobStatus::Migrating);

    assert_eq!(
        h.service.calls(),
        vec!["trigger:1", "abort:1", "trigger:1"]
    );
}

#[tokio::test]
async fn test_migrate_while_migrating_is_not_allowed() {
    let h = harness().await;
    seed(&h, "1", JobStatus::Migrating).await;
    let err = h.dispatcher.migrate("1").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::ActionNotAllowed);
    assert!(h.service.calls().is_empty());
}

#[tokio::test]
async fn test_migrated_job_can_be_migrated_again() {
    let h = harness().await;
    seed(&h, "1", JobStatus::Migrated).await;
    let job = h.dispatcher.migrate("1").await.unwrap();
    assert_eq!(job.status, JobStatus::Migrating);
}

#[tokio::test]
async fn test_abort_requires_migrating() {
    let h = harness().await;
    seed(&h, "1", JobStatus::Uploaded).await;
    let err = h.dispatcher.abort("1").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::ActionNotAllowed);
    assert_eq!(h.store.get("1").unwrap().status, JobStatus::Uploaded);
}

#[tokio::test]
async fn test_rerun_requires_aborted_or_error() {
    let h = harness().await;
    seed(&h, "1", JobStatus::Migrated).await;
    seed(&h, "2", JobStatus::Error).await;

    let err = h.dispatcher.rerun("1").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::ActionNotAllowed);

    let job = h.dispatcher.rerun("2").await.unwrap();
    assert_eq!(job.status, JobStatus::Migrating);
}

#[tokio::test]
async fn test_refused_trigger_leaves_job_untouched() {
    let h = harness().await;
    seed(&h, "1", JobStatus::Uploaded).await;
    h.service.set_failing(true);
    let mut events = h.store.subscribe();
    let revision = h.store.revision();

    let err = h.dispatcher.migrate("1").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::RemoteError);
    assert_eq!(h.store.get("1").unwrap().status, JobStatus::Uploaded);
    assert!(!h.store.any_active());
    assert!(events.try_recv().is_err());
    assert_eq!(h.store.revision(), revision);
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let h = harness().await;
    let err = h.dispatcher.migrate("404").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::NotFound);
}

#[tokio::test]
async fn test_delete_requires_confirmation() {
    let h = harness().await;
    seed(&h, "1", JobStatus::Migrated).await;

    let err = h
        .dispatcher
        .delete("1", Confirmation::Declined)
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::ActionNotAllowed);
    assert!(h.store.get("1").is_ok());

    h.dispatcher
        .delete("1", Confirmation::Confirmed)
        .await
        .unwrap();
    assert_eq!(
        h.store.get("1").unwrap_err().category,
        ErrorCategory::NotFound
    );
}

#[tokio::test]
async fn test_failed_remote_delete_restores_job() {
    let h = harness().await;
    seed(&h, "1", JobStatus::Migrated).await;
    h.service.set_failing(true);

    let err = h
        .dispatcher
        .delete("1", Confirmation::Confirmed)
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::RemoteError);
    assert_eq!(h.store.get("1").unwrap().status, JobStatus::Migrated);
}

#[tokio::test]
async fn test_edit_updates_fields_and_rolls_back_on_failure() {
    let h = harness().await;
    seed(&h, "1", JobStatus::Uploaded).await;

    let job = h
        .dispatcher
        .edit(
            "1",
            JobUpdate {
                source_distribution: None,
                target_model: Some("Gemini Pro".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(job.target_model, "Gemini Pro");
    assert_eq!(job.source_distribution, "Apache Kafka");

    h.service.set_failing(true);
    let err = h
        .dispatcher
        .edit(
            "1",
            JobUpdate {
                source_distribution: Some("Confluent".to_string()),
                target_model: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::RemoteError);
    assert_eq!(
        h.store.get("1").unwrap().source_distribution,
        "Apache Kafka"
    );
}

#[tokio::test]
async fn test_preview_and_download_need_migrated_job() {
    let h = harness().await;
    seed(&h, "1", JobStatus::Migrating).await;
    let tmp = TempDir::new().unwrap();

    let err = h.dispatcher.preview("1", "src/App.java").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::ActionNotAllowed);
    let err = h.dispatcher.download("1", tmp.path()).await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::ActionNotAllowed);
    assert!(h.service.calls().is_empty());
}

#[tokio::test]
async fn test_preview_returns_both_sides() {
    let h = harness().await;
    seed(&h, "1", JobStatus::Migrated).await;
    let diff = h.dispatcher.preview("1", "src/App.java").await.unwrap();
    assert_eq!(diff.path, "src/App.java");
    assert_eq!(diff.original, "kafka.consumer()");
    assert_eq!(diff.transformed, "confluent.consumer()");
}

#[tokio::test]
async fn test_download_writes_named_artifact() {
    let h = harness().await;
    seed(&h, "1", JobStatus::Migrated).await;
    h.service.set_artifact(&[&b"PK"[..], &b"\x03\x04rest"[..]]);
    let tmp = TempDir::new().unwrap();

    let written = h.dispatcher.download("1", tmp.path()).await.unwrap();
    let job = h.store.get("1").unwrap();
    assert_eq!(written, tmp.path().join(artifact_file_name(&job)));
    assert_eq!(
        written.file_name().unwrap().to_str().unwrap(),
        "orders-Apache_Kafka-migrated.zip"
    );
    assert_eq!(std::fs::read(&written).unwrap(), b"PK\x03\x04rest");
}

#[tokio::test]
async fn test_generate_prompt_describes_job() {
    let h = harness().await;
    seed(&h, "1", JobStatus::Uploaded).await;
    let prompt = h.dispatcher.generate_prompt("1").await.unwrap();
    assert!(prompt.starts_with("Migration Plan: "));
    assert!(prompt.contains("orders"));
}

#[tokio::test]
async fn test_persistence_failure_keeps_previous_state() {
    let h = harness().await;
    seed(&h, "1", JobStatus::Uploaded).await;
    h.persistence.set_fail_saves(true);

    let err = h.dispatcher.migrate("1").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::PersistenceError);
    assert_eq!(h.store.get("1").unwrap().status, JobStatus::Uploaded);
    assert_eq!(h.service.calls(), vec!["trigger:1"]);
}

#[tokio::test]
async fn test_edit_sends_the_trimmed_values_it_stores() {
    let h = harness().await;
    seed(&h, "1", JobStatus::Uploaded).await;

    let job = h
        .dispatcher
        .edit(
            "1",
            JobUpdate {
                source_distribution: Some("  Confluent ".to_string()),
                target_model: Some("Gemini Pro\n".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(job.source_distribution, "Confluent");
    assert_eq!(job.target_model, "Gemini Pro");

    let remote = h.service.list().await.unwrap();
    let remote = remote.iter().find(|r| r.id == "1").unwrap();
    assert_eq!(remote.source_distribution, job.source_distribution);
    assert_eq!(remote.target_model, job.target_model);
}
