//! Easel Media Storage
//!
//! Stores the image files uploaded to projects, with support for:
//! - Local filesystem storage served by the HTTP layer under a URL prefix
//! - Mock in-memory storage for testing
//! - Probing uploaded bytes for a supported image format and its dimensions

use std::path::{Component, Path};

use thiserror::Error;
use uuid::Uuid;

pub mod local;
pub mod mock;
pub mod probe;

pub use local::LocalMediaStorage;
pub use mock::MockMediaStorage;
pub use probe::{probe_image, ImageInfo, ImageKind};

/// Directory, relative to the storage root, that holds project images
pub const IMAGES_DIR: &str = "images";

/// Port used for the default media URL when `PORT` is unset or invalid
const DEFAULT_PORT: u16 = 3000;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Media configuration error: {0}")]
    Configuration(String),

    #[error("Invalid media path: {0}")]
    InvalidPath(String),

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("Media I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Media storage configuration
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Storage provider (local, mock)
    pub provider: String,
    /// Root directory for the local provider
    pub root: String,
    /// Base of the file links returned to clients. Should be absolute: the
    /// browser client loads images from another origin.
    pub base_url: String,
}

impl MediaConfig {
    /// Create media config from environment variables
    pub fn from_env() -> Result<Self, MediaError> {
        dotenvy::dotenv().ok();

        let provider = std::env::var("MEDIA_PROVIDER").unwrap_or_else(|_| "local".to_string());
        let root = std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string());
        let base_url = std::env::var("MEDIA_URL").unwrap_or_else(|_| {
            let port = std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT);
            format!("http://localhost:{}/media", port)
        });

        if base_url.trim().is_empty() {
            return Err(MediaError::Configuration(
                "MEDIA_URL must not be empty".to_string(),
            ));
        }
        if !base_url.contains("://") {
            tracing::warn!(
                media_url = %base_url,
                "MEDIA_URL is relative; image links only resolve for clients on the API origin"
            );
        }

        Ok(Self {
            provider,
            root,
            base_url,
        })
    }
}

/// Check that a storage path is relative and stays inside the storage root
pub fn validate_path(path: &str) -> Result<(), MediaError> {
    if path.is_empty() {
        return Err(MediaError::InvalidPath("empty path".to_string()));
    }
    let all_normal = Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !all_normal {
        return Err(MediaError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Path component of a media URL, without a trailing slash.
///
/// `http://localhost:3000/media/` and `/media` both give `/media`.
pub fn url_path(base_url: &str) -> &str {
    let path = match base_url.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |i| &rest[i..]),
        None => base_url,
    };
    path.trim_end_matches('/')
}

/// Generate the storage path for a new image of the given kind
pub fn image_path(kind: ImageKind) -> String {
    format!("{}/{}.{}", IMAGES_DIR, Uuid::new_v4().simple(), kind.extension())
}

/// Media storage trait for different backends
#[async_trait::async_trait]
pub trait MediaStorage: Send + Sync {
    /// Write a file at a storage-relative path, replacing any existing file
    async fn save(&self, path: &str, bytes: &[u8]) -> Result<(), MediaError>;

    /// Remove a file; removing a missing file is not an error
    async fn delete(&self, path: &str) -> Result<(), MediaError>;

    /// Whether a file exists at the path
    async fn exists(&self, path: &str) -> Result<bool, MediaError>;

    /// URL prefix under which stored files are reachable
    fn base_url(&self) -> &str;

    /// Directory to serve under `base_url`, for backends that keep files on local disk
    fn local_root(&self) -> Option<&Path> {
        None
    }

    /// Public URL of a stored file
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url().trim_end_matches('/'), path)
    }

    /// Store a probed image under a generated name and return its path
    async fn store_image(&self, info: &ImageInfo, bytes: &[u8]) -> Result<String, MediaError> {
        let path = image_path(info.kind);
        self.save(&path, bytes).await?;
        tracing::debug!(path = %path, size = bytes.len(), "Stored image");
        Ok(path)
    }
}

/// Media storage factory
pub struct MediaStorageFactory;

impl MediaStorageFactory {
    /// Create media storage based on configuration
    pub async fn create(config: MediaConfig) -> Result<Box<dyn MediaStorage>, MediaError> {
        match config.provider.as_str() {
            "local" | "fs" => {
                tracing::info!(root = %config.root, "Creating local media storage");
                let storage = LocalMediaStorage::create(config.root, config.base_url).await?;
                Ok(Box::new(storage))
            }
            "mock" => {
                tracing::info!("Creating mock media storage");
                Ok(Box::new(MockMediaStorage::with_base_url(config.base_url)))
            }
            provider => Err(MediaError::Configuration(format!(
                "Unknown media provider: {}. Supported providers: local, mock",
                provider
            ))),
        }
    }
}
