pub mod catalog;
pub mod composer;
pub mod config;
pub mod dispatcher;
pub mod entities;
pub mod error;
pub mod job_store;
pub mod persistence;
pub mod prompt;
pub mod service;
pub mod synchronizer;
pub mod template;
pub mod types;

pub use catalog::OptionCatalog;
pub use config::{ConfigLoader, ConfigValidator, MigratorConfig};
pub use dispatcher::{ActionDispatcher, Confirmation};
pub use entities::{FileHandle, Job, JobRecord, NewJob, Pipeline, Stage, Template};
pub use error::AppError;
pub use job_store::{JobStore, StoreEvent};
pub use persistence::{FileStore, MemoryStore, PersistentStore};
pub use service::{HttpTransformationService, TransformationService};
pub use synchronizer::{StatusSynchronizer, SynchronizerHandle};
pub use template::TemplateManager;
pub use types::*;
