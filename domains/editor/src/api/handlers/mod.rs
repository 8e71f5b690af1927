//! Editor API handlers

pub mod images;
pub mod layers;
pub mod projects;

use easel_common::{Error, RepositoryError, Result};
use easel_media::MediaError;

use crate::api::middleware::EditorState;
use crate::domain::entities::ImageFile;
use crate::domain::validation::ValidImage;

pub const PROJECT_NOT_FOUND: &str = "Project not found.";
pub const IMAGE_NOT_FOUND: &str = "Image not found.";
pub const LAYER_NOT_FOUND: &str = "Layer not found.";

/// Returned when a project that already has an image receives another one
pub const PROJECT_HAS_IMAGE: &str =
    "This project already has an image. Delete the existing image before uploading a new one.";

fn storage_error(err: MediaError) -> Error {
    Error::Storage(err.to_string())
}

/// Map a failed image write, reporting a taken project as the one-image conflict
fn image_write_error(err: RepositoryError) -> Error {
    match err {
        RepositoryError::AlreadyExists => Error::Conflict(PROJECT_HAS_IMAGE.to_string()),
        other => other.into(),
    }
}

/// Write a validated upload to media storage
async fn store_upload(state: &EditorState, upload: &ValidImage) -> Result<ImageFile> {
    let path = state
        .media
        .store_image(&upload.info, &upload.bytes)
        .await
        .map_err(storage_error)?;

    match ImageFile::new(
        path.clone(),
        upload.original_name.as_deref(),
        &upload.info,
        upload.bytes.len(),
    ) {
        Ok(file) => Ok(file),
        Err(e) => {
            discard_file(state, &path).await;
            Err(e)
        }
    }
}

/// Remove a stored file, logging instead of failing the request
#[mutants::skip] // Best-effort cleanup; only the warning differs
async fn discard_file(state: &EditorState, path: &str) {
    if let Err(e) = state.media.delete(path).await {
        tracing::warn!(path = %path, error = %e, "Failed to remove stored image file");
    }
}
