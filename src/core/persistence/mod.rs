#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Durable key-value storage for local state.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn save(&self, key: &str, value: &[u8]) -> Result<(), AppError>;
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;
}

fn validate_key(key: &str) -> Result<(), AppError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(AppError::validation(format!(
            "invalid persistence key '{}'",
            key
        )));
    }
    Ok(())
}

/// Stores each key as `<root>/<key>.json`, replaced atomically on save.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        FileStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

#[async_trait]
impl PersistentStore for FileStore {
    async fn save(&self, key: &str, value: &[u8]) -> Result<(), AppError> {
        validate_key(key)?;
        let root = self.root.clone();
        let target = self.path_for(key);
        let value = value.to_vec();
        tokio::task::spawn_blocking(move || write_atomically(&root, &target, &value))
            .await
            .map_err(|err| AppError::persistence(format!("state write task failed: {}", err)))?
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        validate_key(key)?;
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(AppError::persistence(format!(
                "failed to read {}: {}",
                path.display(),
                err
            ))),
        }
    }
}

/// Write through a temp file in `root`, fsync, then rename over `target`.
fn write_atomically(root: &Path, target: &Path, value: &[u8]) -> Result<(), AppError> {
    std::fs::create_dir_all(root).map_err(|err| {
        AppError::persistence(format!(
            "failed to create state directory {}: {}",
            root.display(),
            err
        ))
    })?;
    let mut tmp = tempfile::NamedTempFile::new_in(root).map_err(|err| {
        AppError::persistence(format!(
            "failed to stage write in {}: {}",
            root.display(),
            err
        ))
    })?;
    tmp.write_all(value)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|err| {
            AppError::persistence(format!("failed to write {}: {}", target.display(), err))
        })?;
    tmp.persist(target).map_err(|err| {
        AppError::persistence(format!(
            "failed to replace {}: {}",
            target.display(),
            err.error
        ))
    })?;
    Ok(())
}

/// In-process store; state is lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail, to exercise rollback paths.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn save(&self, key: &str, value: &[u8]) -> Result<(), AppError> {
        validate_key(key)?;
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(AppError::persistence(format!(
                "memory store rejected save of '{}'",
                key
            )));
        }
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        validate_key(key)?;
        Ok(self.raw(key))
    }
}
