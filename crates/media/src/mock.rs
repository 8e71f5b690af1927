//! Mock Media Storage Implementation
//!
//! Keeps stored files in memory so tests can inspect what was written and
//! removed without touching the filesystem.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{validate_path, MediaError, MediaStorage};

/// Mock media storage for testing
#[derive(Debug, Clone)]
pub struct MockMediaStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
    base_url: String,
}

impl MockMediaStorage {
    /// Create a new mock storage serving under `/media`
    pub fn new() -> Self {
        Self::with_base_url("/media")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            fail_writes: Arc::new(AtomicBool::new(false)),
            base_url: base_url.into(),
        }
    }

    fn files(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make subsequent saves fail with an I/O error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Get the stored bytes of a file
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files().get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files().contains_key(path)
    }

    /// Get count of stored files
    pub fn file_count(&self) -> usize {
        self.files().len()
    }

    /// Paths of all stored files, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Clear all stored files
    pub fn clear(&self) {
        self.files().clear();
    }
}

impl Default for MockMediaStorage {
    #[mutants::skip] // Same as new()
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MediaStorage for MockMediaStorage {
    async fn save(&self, path: &str, bytes: &[u8]) -> Result<(), MediaError> {
        validate_path(path)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(MediaError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "mock storage write failure",
            )));
        }
        self.files().insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), MediaError> {
        validate_path(path)?;
        self.files().remove(path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, MediaError> {
        validate_path(path)?;
        Ok(self.contains(path))
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
