//! Blob stores for published images.
//!
//! Keys are relative, slash-separated paths such as `{book_id}/{order}.png`.
//! Both stores publish objects under `{public_base_url}/api/v1/images/{key}`,
//! which the API serves back through `BlobStore::get`.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use storyloom_core::error::DomainError;
use storyloom_core::ports::BlobStore;
use tokio::sync::RwLock;
use tracing::debug;

/// Path prefix under which blobs are served.
pub const IMAGE_ROUTE_PREFIX: &str = "/api/v1/images";

fn public_url(base: &str, key: &str) -> String {
    format!("{}{IMAGE_ROUTE_PREFIX}/{key}", base.trim_end_matches('/'))
}

/// Rejects keys that could escape the store's root.
fn validate_key(key: &str) -> Result<&Path, DomainError> {
    let path = Path::new(key);
    let safe = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if safe {
        Ok(path)
    } else {
        Err(DomainError::Validation(format!("invalid blob key {key:?}")))
    }
}

/// Blob store held in process memory.
#[derive(Debug)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    public_base_url: String,
}

impl MemoryBlobStore {
    /// Create an empty store publishing under `public_base_url`.
    #[must_use]
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            public_base_url: public_base_url.into(),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), DomainError> {
        validate_key(key)?;
        self.objects.write().await.insert(key.to_owned(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, DomainError> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("blob {key}")))
    }

    fn public_url(&self, key: &str) -> String {
        public_url(&self.public_base_url, key)
    }
}

/// Blob store backed by a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    /// Create a store rooted at `root`. The directory is created on first
    /// write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), DomainError> {
        let path = self.root.join(validate_key(key)?);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::StorageUnavailable(format!("create {key}: {e}")))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| DomainError::StorageUnavailable(format!("write {key}: {e}")))?;
        debug!(%key, path = %path.display(), "blob written");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, DomainError> {
        let path = self.root.join(validate_key(key)?);
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => DomainError::NotFound(format!("blob {key}")),
            _ => DomainError::StorageUnavailable(format!("read {key}: {e}")),
        })
    }

    fn public_url(&self, key: &str) -> String {
        public_url(&self.public_base_url, key)
    }
}
