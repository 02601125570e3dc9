use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

/// Object storage for uploaded venue pictures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores the bytes under `key` and returns the public URL.
    async fn put(&self, key: String, content_type: String, bytes: Vec<u8>) -> Result<String>;
}

/// Writes pictures under a local directory that the router serves statically.
pub struct LocalImageStore {
    root: PathBuf,
    base_url: String,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn put(&self, key: String, content_type: String, bytes: Vec<u8>) -> Result<String> {
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        info!("Stored {} ({} bytes, {})", key, bytes.len(), content_type);
        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_file_and_returns_public_url() {
        let root = std::env::temp_dir().join(format!("venue-images-{}", uuid::Uuid::new_v4()));
        let store = LocalImageStore::new(&root, "/uploads/");

        let url = store
            .put("venues/abc/1.png".to_string(), "image/png".to_string(), vec![1, 2, 3])
            .await
            .unwrap();

        assert_eq!(url, "/uploads/venues/abc/1.png");
        assert_eq!(tokio::fs::read(root.join("venues/abc/1.png")).await.unwrap(), vec![1, 2, 3]);
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
