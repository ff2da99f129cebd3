//! Durable key-value stores.
//!
//! [`FileStore`] keeps all values in one JSON object on disk. Every
//! read-modify-write runs under two locks: a process-local async mutex and an
//! exclusive `fs4` lock on a sibling `.lock` file, so two `quicktext` processes
//! incrementing the counter at the same time never lose an update.

use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use fs4::fs_std::FileExt;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{KeyValueStore, StoreUpdate};
use crate::core::QuicktextError;
use crate::utils::atomic_write;

/// Exclusive advisory lock on the store's lock file, released on drop.
struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    async fn acquire(lock_path: &Path) -> Result<Self> {
        if let Some(parent) = lock_path.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create store directory: {}", parent.display())
            })?;
        }

        let path = lock_path.to_path_buf();
        let open_path = path.clone();
        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&open_path)
                .with_context(|| format!("Failed to open lock file: {}", open_path.display()))?;
            file.lock_exclusive()
                .with_context(|| format!("Failed to lock {}", open_path.display()))?;
            Ok(file)
        })
        .await
        .context("Failed to spawn blocking task for store lock")??;

        Ok(Self { file, path })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}

/// JSON file backed store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    /// Store values in the JSON file at `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    async fn read_all(&self) -> Result<BTreeMap<String, Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| QuicktextError::store("read", e))
                .with_context(|| format!("Store file {} is corrupt", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(QuicktextError::store("read", e).into()),
        }
    }

    async fn write_all(&self, values: &BTreeMap<String, Value>) -> Result<()> {
        let content = serde_json::to_vec_pretty(values)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || atomic_write(&path, &content))
            .await
            .context("Failed to spawn blocking task for store write")?
            .map_err(|e| QuicktextError::store("write", format!("{e:#}")).into())
    }

    async fn modify(&self, key: &str, update: StoreUpdate) -> Result<Value> {
        let _guard = self.guard.lock().await;
        let _lock = StoreLock::acquire(&self.lock_path()).await?;

        let mut values = self.read_all().await?;
        let next = update(values.get(key).cloned());
        values.insert(key.to_string(), next.clone());
        self.write_all(&values).await?;
        Ok(next)
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.guard.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.modify(key, Box::new(move |_| value)).await.map(|_| ())
    }

    async fn update(&self, key: &str, update: StoreUpdate) -> Result<Value> {
        self.modify(key, update).await
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `values`.
    #[must_use]
    pub fn with_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn update(&self, key: &str, update: StoreUpdate) -> Result<Value> {
        let mut values = self.values.lock().await;
        let next = update(values.get(key).cloned());
        values.insert(key.to_string(), next.clone());
        Ok(next)
    }
}
