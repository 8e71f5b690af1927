//! Image API handlers
//!
//! Creation and updates take `multipart/form-data` with a `project` id and an
//! `image_file` part. A project holds at most one image: the UNIQUE
//! constraint on `images.project_id` decides, and `upload_to_project` adds a
//! friendlier pre-check in front of it.

use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use easel_common::{Error, MultipartForm, ResourcePath, Result};
use easel_media::MediaStorage;
use serde::Serialize;
use serde_json::json;

use super::layers::LayerResponse;
use super::{
    discard_file, image_write_error, store_upload, IMAGE_NOT_FOUND, PROJECT_HAS_IMAGE,
};
use crate::api::middleware::EditorState;
use crate::domain::entities::{Id, Image, Layer};
use crate::domain::validation::{
    missing_related, validate_image_update, validate_image_upload, ImageUpload, PROJECT_FIELD,
};

/// Body returned by `delete_with_layers`
pub const IMAGE_AND_LAYERS_DELETED: &str = "Image and its layers were deleted.";

/// Image response DTO
#[derive(Debug, Clone, Serialize)]
pub struct ImageResponse {
    pub id: Id,
    pub project: Id,
    /// Public URL of the stored file
    pub image_file: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub width: i32,
    pub height: i32,
    pub layers: Vec<LayerResponse>,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImageResponse {
    pub fn new(image: Image, layers: Vec<Layer>, media: &dyn MediaStorage) -> Self {
        Self {
            id: image.id,
            project: image.project_id,
            image_file: media.url(&image.file_path),
            original_name: image.original_name,
            content_type: image.content_type,
            size_bytes: image.size_bytes,
            width: image.width,
            height: image.height,
            layers: layers.into_iter().map(Into::into).collect(),
            uploaded_at: image.uploaded_at,
            updated_at: image.updated_at,
        }
    }
}

/// Build responses for several images, loading their layers in one query
pub(crate) async fn image_responses(
    state: &EditorState,
    images: Vec<Image>,
) -> Result<Vec<ImageResponse>> {
    let ids: Vec<Id> = images.iter().map(|i| i.id).collect();
    let mut layers_by_image: HashMap<Id, Vec<Layer>> = HashMap::new();
    for layer in state.repos.layers.list_by_images(&ids).await? {
        layers_by_image.entry(layer.image_id).or_default().push(layer);
    }

    Ok(images
        .into_iter()
        .map(|image| {
            let layers = layers_by_image.remove(&image.id).unwrap_or_default();
            ImageResponse::new(image, layers, state.media.as_ref())
        })
        .collect())
}

async fn image_response(state: &EditorState, image: Image) -> Result<ImageResponse> {
    let layers = state.repos.layers.list(Some(image.id)).await?;
    Ok(ImageResponse::new(image, layers, state.media.as_ref()))
}

async fn find_image(state: &EditorState, id: Id) -> Result<Image> {
    state
        .repos
        .images
        .find(id)
        .await?
        .ok_or_else(|| Error::NotFound(IMAGE_NOT_FOUND.to_string()))
}

/// The referenced project must exist; reported against the `project` field
async fn ensure_project(state: &EditorState, project_id: Id) -> Result<()> {
    if state.repos.projects.find(project_id).await?.is_none() {
        return Err(missing_related(PROJECT_FIELD, project_id).into());
    }
    Ok(())
}

/// Store the uploaded file and insert the image row.
///
/// The stored file is removed again when the insert fails, including when
/// the project already has an image.
async fn attach_image(state: &EditorState, upload: ImageUpload) -> Result<Image> {
    let file = store_upload(state, &upload.image).await?;
    let path = file.path.clone();

    let image = match Image::new(upload.project_id, file) {
        Ok(image) => image,
        Err(e) => {
            discard_file(state, &path).await;
            return Err(e);
        }
    };

    match state.repos.images.create(&image).await {
        Ok(created) => {
            tracing::info!(
                image_id = %created.id,
                project_id = %created.project_id,
                content_type = %created.content_type,
                size_bytes = created.size_bytes,
                "Image uploaded"
            );
            Ok(created)
        }
        Err(e) => {
            discard_file(state, &path).await;
            Err(image_write_error(e))
        }
    }
}

/// Delete an image row with its layers, then its stored file
async fn remove_image(state: &EditorState, image: &Image) -> Result<()> {
    let layers_deleted = state
        .repos
        .images
        .delete_with_layers(image.id)
        .await?
        .unwrap_or(0);
    discard_file(state, &image.file_path).await;

    tracing::info!(
        image_id = %image.id,
        project_id = %image.project_id,
        layers_deleted,
        "Image deleted"
    );
    Ok(())
}

/// List all images with their layers
pub async fn list_images(State(state): State<EditorState>) -> Result<Json<Vec<ImageResponse>>> {
    let images = state.repos.images.list().await?;
    Ok(Json(image_responses(&state, images).await?))
}

/// Create an image for a project (multipart `project`, `image_file`)
pub async fn create_image(
    State(state): State<EditorState>,
    form: MultipartForm,
) -> Result<(StatusCode, Json<ImageResponse>)> {
    let upload = validate_image_upload(form)?;
    ensure_project(&state, upload.project_id).await?;

    let created = attach_image(&state, upload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ImageResponse::new(created, Vec::new(), state.media.as_ref())),
    ))
}

/// Attach an image to a project that has none yet
pub async fn upload_to_project(
    State(state): State<EditorState>,
    form: MultipartForm,
) -> Result<(StatusCode, Json<ImageResponse>)> {
    let upload = validate_image_upload(form)?;
    ensure_project(&state, upload.project_id).await?;

    if let Some(existing) = state.repos.images.find_by_project(upload.project_id).await? {
        tracing::info!(
            project_id = %upload.project_id,
            image_id = %existing.id,
            "Rejected upload to project that already has an image"
        );
        return Err(Error::Conflict(PROJECT_HAS_IMAGE.to_string()));
    }

    let created = attach_image(&state, upload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ImageResponse::new(created, Vec::new(), state.media.as_ref())),
    ))
}

/// Get a single image by ID, with its layers
pub async fn get_image(
    State(state): State<EditorState>,
    ResourcePath(id): ResourcePath<Id>,
) -> Result<Json<ImageResponse>> {
    let image = find_image(&state, id).await?;
    Ok(Json(image_response(&state, image).await?))
}

/// Replace an image (PUT, both fields required)
pub async fn update_image(
    State(state): State<EditorState>,
    ResourcePath(id): ResourcePath<Id>,
    form: MultipartForm,
) -> Result<Json<ImageResponse>> {
    save_image(state, id, form, false).await
}

/// Partially update an image (PATCH)
pub async fn patch_image(
    State(state): State<EditorState>,
    ResourcePath(id): ResourcePath<Id>,
    form: MultipartForm,
) -> Result<Json<ImageResponse>> {
    save_image(state, id, form, true).await
}

async fn save_image(
    state: EditorState,
    id: Id,
    form: MultipartForm,
    partial: bool,
) -> Result<Json<ImageResponse>> {
    let mut image = find_image(&state, id).await?;
    let update = validate_image_update(form, partial)?;

    if let Some(project_id) = update.project_id {
        if project_id != image.project_id {
            ensure_project(&state, project_id).await?;
            image.move_to(project_id);
        }
    }

    let mut replaced = None;
    if let Some(ref upload) = update.image {
        let file = store_upload(&state, upload).await?;
        let new_path = file.path.clone();
        match image.replace_file(file) {
            Ok(previous) => replaced = Some((previous, new_path)),
            Err(e) => {
                discard_file(&state, &new_path).await;
                return Err(e);
            }
        }
    }

    let saved = match state.repos.images.update(&image).await {
        Ok(Some(saved)) => saved,
        Ok(None) => {
            if let Some((_, new_path)) = replaced {
                discard_file(&state, &new_path).await;
            }
            return Err(Error::NotFound(IMAGE_NOT_FOUND.to_string()));
        }
        Err(e) => {
            if let Some((_, new_path)) = replaced {
                discard_file(&state, &new_path).await;
            }
            return Err(image_write_error(e));
        }
    };

    // The previous file is only removed once the row points at the new one
    if let Some((previous, _)) = replaced {
        discard_file(&state, &previous).await;
    }

    tracing::info!(image_id = %saved.id, project_id = %saved.project_id, "Image updated");
    Ok(Json(image_response(&state, saved).await?))
}

/// Delete an image and its layers
pub async fn delete_image(
    State(state): State<EditorState>,
    ResourcePath(id): ResourcePath<Id>,
) -> Result<StatusCode> {
    let image = find_image(&state, id).await?;
    remove_image(&state, &image).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete an image together with every layer drawn on it
pub async fn delete_with_layers(
    State(state): State<EditorState>,
    ResourcePath(id): ResourcePath<Id>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let image = find_image(&state, id).await?;
    remove_image(&state, &image).await?;

    Ok((
        StatusCode::NO_CONTENT,
        Json(json!({ "detail": IMAGE_AND_LAYERS_DELETED })),
    ))
}
