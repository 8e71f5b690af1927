//! Layer API handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use easel_common::{Error, ResourcePath, Result, ValidatedJson};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::LAYER_NOT_FOUND;
use crate::api::middleware::EditorState;
use crate::domain::entities::{Id, Layer, ShapeType};
use crate::domain::validation::{
    missing_related, validate_layer_changes, validate_new_layer, IMAGE_FIELD,
};

/// Request body for creating or updating a layer
#[derive(Debug, Deserialize, Validate)]
pub struct LayerRequest {
    /// Id of the image the layer is drawn on
    pub image: Option<Id>,

    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub layer_id: Option<i32>,

    /// Parsed during validation so an unknown shape is a field error
    pub shape_type: Option<String>,

    pub properties: Option<serde_json::Value>,
}

/// Query params for listing layers
#[derive(Debug, Deserialize)]
pub struct ListLayersQuery {
    pub image: Option<Id>,
}

/// Layer response DTO
#[derive(Debug, Clone, Serialize)]
pub struct LayerResponse {
    pub id: Id,
    pub image: Id,
    pub layer_id: i32,
    pub shape_type: ShapeType,
    pub properties: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Layer> for LayerResponse {
    fn from(l: Layer) -> Self {
        Self {
            id: l.id,
            image: l.image_id,
            layer_id: l.layer_id,
            shape_type: l.shape_type,
            properties: l.properties.0,
            created_at: l.created_at,
            updated_at: l.updated_at,
        }
    }
}

/// The referenced image must exist; reported against the `image` field
async fn ensure_image(state: &EditorState, image_id: Id) -> Result<()> {
    if state.repos.images.find(image_id).await?.is_none() {
        return Err(missing_related(IMAGE_FIELD, image_id).into());
    }
    Ok(())
}

async fn find_layer(state: &EditorState, id: Id) -> Result<Layer> {
    state
        .repos
        .layers
        .find(id)
        .await?
        .ok_or_else(|| Error::NotFound(LAYER_NOT_FOUND.to_string()))
}

/// List layers, optionally only those drawn on one image
pub async fn list_layers(
    State(state): State<EditorState>,
    Query(query): Query<ListLayersQuery>,
) -> Result<Json<Vec<LayerResponse>>> {
    let layers = state.repos.layers.list(query.image).await?;
    Ok(Json(layers.into_iter().map(Into::into).collect()))
}

/// Create a layer on an existing image
pub async fn create_layer(
    State(state): State<EditorState>,
    ValidatedJson(req): ValidatedJson<LayerRequest>,
) -> Result<(StatusCode, Json<LayerResponse>)> {
    let new = validate_new_layer(req.image, req.layer_id, req.shape_type, req.properties)?;
    ensure_image(&state, new.image_id).await?;

    let layer = Layer::new(new.image_id, new.layer_id, new.shape_type, new.properties)?;
    let created = state.repos.layers.create(&layer).await?;

    tracing::info!(
        layer_id = %created.id,
        image_id = %created.image_id,
        shape_type = %created.shape_type,
        "Layer created"
    );
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Get a single layer by ID
pub async fn get_layer(
    State(state): State<EditorState>,
    ResourcePath(id): ResourcePath<Id>,
) -> Result<Json<LayerResponse>> {
    let layer = find_layer(&state, id).await?;
    Ok(Json(layer.into()))
}

/// Replace a layer (PUT)
pub async fn update_layer(
    State(state): State<EditorState>,
    ResourcePath(id): ResourcePath<Id>,
    ValidatedJson(req): ValidatedJson<LayerRequest>,
) -> Result<Json<LayerResponse>> {
    save_layer(state, id, req, false).await
}

/// Partially update a layer (PATCH)
pub async fn patch_layer(
    State(state): State<EditorState>,
    ResourcePath(id): ResourcePath<Id>,
    ValidatedJson(req): ValidatedJson<LayerRequest>,
) -> Result<Json<LayerResponse>> {
    save_layer(state, id, req, true).await
}

async fn save_layer(
    state: EditorState,
    id: Id,
    req: LayerRequest,
    partial: bool,
) -> Result<Json<LayerResponse>> {
    let mut layer = find_layer(&state, id).await?;

    let changes = validate_layer_changes(
        req.image,
        req.layer_id,
        req.shape_type,
        req.properties,
        partial,
    )?;
    if let Some(image_id) = changes.image_id {
        if image_id != layer.image_id {
            ensure_image(&state, image_id).await?;
        }
    }

    layer.apply(changes)?;
    let updated = state
        .repos
        .layers
        .update(&layer)
        .await?
        .ok_or_else(|| Error::NotFound(LAYER_NOT_FOUND.to_string()))?;

    Ok(Json(updated.into()))
}

/// Delete a layer
pub async fn delete_layer(
    State(state): State<EditorState>,
    ResourcePath(id): ResourcePath<Id>,
) -> Result<StatusCode> {
    if !state.repos.layers.delete(id).await? {
        return Err(Error::NotFound(LAYER_NOT_FOUND.to_string()));
    }

    tracing::info!(layer_id = %id, "Layer deleted");
    Ok(StatusCode::NO_CONTENT)
}
