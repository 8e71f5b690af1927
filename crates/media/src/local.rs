//! Local filesystem media storage

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::{validate_path, MediaError, MediaStorage};

/// Stores files below a root directory on local disk
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalMediaStorage {
    /// Create the storage, making sure the root directory exists
    pub async fn create(
        root: impl Into<PathBuf>,
        base_url: impl Into<String>,
    ) -> Result<Self, MediaError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            base_url: base_url.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, MediaError> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }
}

#[async_trait::async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn save(&self, path: &str, bytes: &[u8]) -> Result<(), MediaError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, bytes).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), MediaError> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, MediaError> {
        let target = self.resolve(path)?;
        Ok(fs::try_exists(&target).await?)
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn local_root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}
