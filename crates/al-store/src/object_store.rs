//! Blob storage for generated documents (project plans, assay archives,
//! analysis dumps).

use std::fmt;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use al_types::{invalid_input, AlResult};

/// Write-mostly blob store keyed by slash-separated paths.
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    async fn put(&self, key: &str, bytes: &[u8]) -> AlResult<()>;

    async fn get(&self, key: &str) -> AlResult<Option<Vec<u8>>>;

    /// Keys currently stored, in unspecified order.
    async fn list(&self) -> AlResult<Vec<String>>;
}

/// In-memory object store for tests and the demo service.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, Vec<u8>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> AlResult<()> {
        self.objects.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> AlResult<Option<Vec<u8>>> {
        Ok(self.objects.get(key).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> AlResult<Vec<String>> {
        Ok(self.objects.iter().map(|e| e.key().clone()).collect())
    }
}

/// Object store backed by a directory tree; each key becomes a relative file
/// path under the root.
#[derive(Debug)]
pub struct FileObjectStore {
    root: PathBuf,
}

impl FileObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Keys must stay inside the root: no absolute paths, no parent
    /// components.
    fn resolve(&self, key: &str) -> AlResult<PathBuf> {
        let relative = Path::new(key);
        let safe = relative.components().all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !safe {
            return Err(invalid_input!("invalid object key: {key:?}"));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FileObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> AlResult<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!(key, bytes = bytes.len(), "object written");
        Ok(())
    }

    async fn get(&self, key: &str) -> AlResult<Option<Vec<u8>>> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> AlResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut stack = vec![self.root.clone()];
        while let Some(dir) = stack.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.root) {
                    keys.push(relative.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        Ok(keys)
    }
}
