use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main migrator configuration loaded from migrator.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MigratorConfig {
    /// Transformation service connection
    #[serde(default)]
    pub service: ServiceConfig,

    /// Status synchronizer settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Local state storage
    #[serde(default)]
    pub store: StoreConfig,

    /// Option catalog source
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Seconds between status refreshes while a job is migrating
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Never issue a refresh while the previous one is outstanding
    #[serde(default = "default_skip_overlapping")]
    pub skip_overlapping: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Directory holding jobs.json, pipelines.json, templates.json, pipeline_options.json
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CatalogConfig {
    /// TOML option catalog; the built-in catalog is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_interval_secs() -> u64 {
    5
}

fn default_skip_overlapping() -> bool {
    true
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".migrator/state")
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            interval_secs: default_interval_secs(),
            skip_overlapping: default_skip_overlapping(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            state_dir: default_state_dir(),
        }
    }
}


pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;
