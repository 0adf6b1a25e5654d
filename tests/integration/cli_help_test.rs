use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn migrator(workspace: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("migrator"));
    cmd.arg("--workspace")
        .arg(workspace.path())
        .env("MIGRATOR_SERVICE_URL", "http://127.0.0.1:9")
        .env("MIGRATOR_SERVICE_TIMEOUT_SECS", "1")
        .env_remove("MIGRATOR_STATE_DIR")
        .env_remove("MIGRATOR_CATALOG_FILE")
        .env_remove("RUST_LOG");
    cmd
}

fn seed_jobs(workspace: &TempDir, json: &str) {
    let state = workspace.path().join(".migrator/state");
    fs::create_dir_all(&state).unwrap();
    fs::write(state.join("jobs.json"), json).unwrap();
}

const ONE_JOB: &str = r#"[
  {
    "id": "7",
    "source_label": "orders",
    "source_distribution": "Apache Kafka",
    "target_model": "GPT-4",
    "file_count": 3,
    "status": "migrating",
    "created_at": "2026-01-05T10:00:00Z"
  }
]"#;

#[test]
fn test_top_level_help_lists_commands() {
    let output = std::process::Command::new(assert_cmd::cargo::cargo_bin!("migrator"))
        .arg("--help")
        .output()
        .expect("should run successfully");

    let stdout = std::str::from_utf8(&output.stdout).unwrap();
    for command in ["jobs", "pipelines", "templates", "catalog", "refresh", "watch"] {
        assert!(stdout.contains(command), "missing {} in help", command);
    }
    assert!(stdout.contains("COMMANDS"));
}

#[test]
fn test_jobs_help_lists_actions() {
    let output = std::process::Command::new(assert_cmd::cargo::cargo_bin!("migrator"))
        .args(["jobs", "--help"])
        .output()
        .expect("should run successfully");

    let stdout = std::str::from_utf8(&output.stdout).unwrap();
    for action in ["submit", "migrate", "abort", "rerun", "delete", "preview", "download"] {
        assert!(stdout.contains(action), "missing {} in jobs help", action);
    }
}

#[test]
fn test_version_flag() {
    std::process::Command::new(assert_cmd::cargo::cargo_bin!("migrator"))
        .arg("--version")
        .output()
        .map(|output| {
            let stdout = String::from_utf8_lossy(&output.stdout);
            assert!(stdout.contains(migrator::VERSION));
        })
        .expect("should run successfully");
}

#[test]
fn test_catalog_show_prints_builtin_objectives() {
    let workspace = TempDir::new().unwrap();
    migrator(&workspace)
        .args(["catalog", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Extraction and Analysis"))
        .stdout(predicate::str::contains("Code Conversion"));
}

#[test]
fn test_jobs_list_on_empty_state() {
    let workspace = TempDir::new().unwrap();
    migrator(&workspace)
        .args(["jobs", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No jobs"));
}

#[test]
fn test_jobs_list_reads_persisted_jobs() {
    let workspace = TempDir::new().unwrap();
    seed_jobs(&workspace, ONE_JOB);
    migrator(&workspace)
        .args(["jobs", "list", "--search", "ORDERS"])
        .assert()
        .success()
        .stdout(predicate::str::contains("orders"))
        .stdout(predicate::str::contains("migrating"));
}

#[test]
fn test_delete_without_confirmation_is_rejected() {
    let workspace = TempDir::new().unwrap();
    seed_jobs(&workspace, ONE_JOB);
    migrator(&workspace)
        .args(["jobs", "delete", "7"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not confirmed"));

    let persisted = fs::read_to_string(workspace.path().join(".migrator/state/jobs.json")).unwrap();
    assert!(persisted.contains("orders"));
}

#[test]
fn test_migrate_of_migrating_job_is_rejected() {
    let workspace = TempDir::new().unwrap();
    seed_jobs(&workspace, ONE_JOB);
    migrator(&workspace)
        .args(["jobs", "migrate", "7"])
        .assert()
        .code(2);
}

#[test]
fn test_corrupt_state_is_fatal() {
    let workspace = TempDir::new().unwrap();
    seed_jobs(&workspace, "{ not json");
    migrator(&workspace)
        .args(["jobs", "list"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("unreadable"));
}

#[test]
fn test_delete_requires_job_id() {
    let workspace = TempDir::new().unwrap();
    migrator(&workspace)
        .args(["jobs", "delete"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JOB_ID"));
}

#[test]
fn test_rejections_are_logged_to_state_dir() {
    let workspace = TempDir::new().unwrap();
    seed_jobs(&workspace, ONE_JOB);
    migrator(&workspace)
        .args(["jobs", "migrate", "7"])
        .assert()
        .code(2);

    let log = fs::read_to_string(workspace.path().join(".migrator/state/logs/migrator.log"))
        .expect("log file should exist");
    assert!(log.contains("rejected"));
}
