use migrator::core::config::{ConfigLoader, ConfigValidator, MigratorConfig};
use migrator::core::types::ErrorCategory;
use migrator::core::OptionCatalog;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_migrator_env() {
    for v in &[
        "MIGRATOR_SERVICE_URL",
        "MIGRATOR_SERVICE_TIMEOUT_SECS",
        "MIGRATOR_SYNC_INTERVAL_SECS",
        "MIGRATOR_SYNC_SKIP_OVERLAPPING",
        "MIGRATOR_STATE_DIR",
        "MIGRATOR_CATALOG_FILE",
    ] {
        env::remove_var(v);
    }
}

/// Test integration of config loading with environment variables
#[test]
#[serial]
fn test_config_loading_integration() {
    clear_migrator_env();
    let temp_dir = TempDir::new().unwrap();
    let workspace_path = temp_dir.path();

    let config_content = r#"
[service]
base_url = "https://migrate.internal:8443/api"
request_timeout_secs = 45

[sync]
interval_secs = 10
skip_overlapping = true

[store]
state_dir = "state"

[catalog]
file = "catalog.toml"
"#;
    fs::write(workspace_path.join("migrator.toml"), config_content).unwrap();

    let config = ConfigLoader::load_from_workspace(workspace_path).unwrap();
    assert_eq!(config.service.base_url, "https://migrate.internal:8443/api");
    assert_eq!(config.service.request_timeout_secs, 45);
    assert_eq!(config.sync.interval_secs, 10);
    assert!(config.sync.skip_overlapping);
    assert_eq!(config.store.state_dir, workspace_path.join("state"));
    assert_eq!(
        config.catalog.file,
        Some(workspace_path.join("catalog.toml"))
    );

    env::set_var("MIGRATOR_SERVICE_URL", "http://localhost:9000");
    env::set_var("MIGRATOR_STATE_DIR", "/var/lib/migrator");
    let config = ConfigLoader::load_from_workspace(workspace_path).unwrap();
    clear_migrator_env();
    assert_eq!(config.service.base_url, "http://localhost:9000");
    assert_eq!(config.store.state_dir, PathBuf::from("/var/lib/migrator"));
    assert_eq!(config.sync.interval_secs, 10);
}

#[test]
#[serial]
fn test_partial_file_keeps_defaults() {
    clear_migrator_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("migrator.toml"),
        "[service]\nbase_url = \"http://svc:8000\"\n",
    )
    .unwrap();

    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    let defaults = MigratorConfig::default();
    assert_eq!(config.service.base_url, "http://svc:8000");
    assert_eq!(
        config.service.request_timeout_secs,
        defaults.service.request_timeout_secs
    );
    assert_eq!(config.sync, defaults.sync);
    assert!(config.catalog.file.is_none());
}

#[test]
#[serial]
fn test_malformed_file_is_configuration_error() {
    clear_migrator_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("migrator.toml"), "[sync\ninterval_secs = ").unwrap();

    let err = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ConfigurationError);
    assert!(err.message.contains("migrator.toml"));
}

#[test]
#[serial]
fn test_zero_interval_is_rejected() {
    clear_migrator_env();
    let temp_dir = TempDir::new().unwrap();
    env::set_var("MIGRATOR_SYNC_INTERVAL_SECS", "0");
    let err = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap_err();
    clear_migrator_env();
    assert_eq!(err.category, ErrorCategory::ConfigurationError);
}

#[test]
fn test_validator_rejects_non_http_service() {
    let mut config = MigratorConfig::default();
    config.service.base_url = "ftp://files.example.com".to_string();
    let err = ConfigValidator::validate(&config).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ConfigurationError);

    config.service.base_url = "not a url".to_string();
    assert!(ConfigValidator::validate(&config).is_err());

    config.service.base_url = "https://ok.example.com".to_string();
    assert!(ConfigValidator::validate(&config).is_ok());
}

#[test]
fn test_catalog_file_replaces_builtin() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("catalog.toml");
    fs::write(
        &path,
        r#"
[[platforms]]
id = "onprem"
label = "On-prem"

[[models]]
id = "llama"
label = "Llama 3"
platform_id = "onprem"

[[objectives]]
id = "convert"
label = "Code Conversion"
platform_ids = ["onprem"]
input_kinds = ["single_files"]
"#,
    )
    .unwrap();

    let catalog = OptionCatalog::load_from_file(&path).unwrap();
    assert_eq!(catalog.platforms.len(), 1);
    assert_eq!(catalog.allowed_models("convert", "onprem").len(), 1);
    assert_ne!(catalog, OptionCatalog::builtin());
}

#[test]
fn test_catalog_file_with_dangling_reference_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("catalog.toml");
    fs::write(
        &path,
        r#"
[[platforms]]
id = "onprem"
label = "On-prem"

[[models]]
id = "llama"
label = "Llama 3"
platform_id = "cloud"
"#,
    )
    .unwrap();

    assert!(OptionCatalog::load_from_file(&path).is_err());
}
