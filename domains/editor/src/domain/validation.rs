//! Payload validation for the Editor domain
//!
//! One function per payload shape. Each collects every field error it finds
//! and returns either the validated payload or the complete error map, so a
//! handler never persists anything from a partially valid request.

use axum::body::Bytes;
use easel_common::{FieldErrors, MultipartForm, UploadedFile};
use easel_media::{probe_image, ImageInfo};

use crate::domain::entities::{
    Id, LayerChanges, ProjectChanges, ShapeType, MAX_DESCRIPTION_LENGTH, MAX_TITLE_LENGTH,
};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NO_FILE: &str = "No file was submitted.";
pub const NOT_A_FILE: &str =
    "The submitted data was not a file. Check the encoding type on the form.";
pub const EMPTY_FILE: &str = "The submitted file is empty.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const NOT_AN_OBJECT: &str = "Expected a JSON object.";
pub const INCORRECT_PK_TYPE: &str = "Incorrect type. Expected pk value, received str.";

/// Multipart field names
pub const TITLE_FIELD: &str = "title";
pub const DESCRIPTION_FIELD: &str = "description";
pub const PROJECT_FIELD: &str = "project";
pub const IMAGE_FILE_FIELD: &str = "image_file";
pub const IMAGE_FIELD: &str = "image";
pub const LAYER_ID_FIELD: &str = "layer_id";
pub const SHAPE_TYPE_FIELD: &str = "shape_type";
pub const PROPERTIES_FIELD: &str = "properties";

/// An uploaded file that decoded as a supported image
#[derive(Debug, Clone)]
pub struct ValidImage {
    pub info: ImageInfo,
    pub original_name: Option<String>,
    pub bytes: Bytes,
}

/// Validated fields of a new project
#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub title: String,
    pub description: Option<String>,
}

/// Validated `POST /projects/upload/` form
#[derive(Debug, Clone)]
pub struct ProjectUpload {
    pub project: NewProject,
    pub image: ValidImage,
}

/// Validated fields of a new layer
#[derive(Debug, Clone, PartialEq)]
pub struct NewLayer {
    pub image_id: Id,
    pub layer_id: i32,
    pub shape_type: ShapeType,
    pub properties: serde_json::Value,
}

/// Validated image creation form
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub project_id: Id,
    pub image: ValidImage,
}

/// Validated image update form; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct ImageUpdate {
    pub project_id: Option<Id>,
    pub image: Option<ValidImage>,
}

/// Message for a related id that does not resolve to a record
pub fn does_not_exist(id: Id) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

/// Field errors for a single related id that does not resolve
pub fn missing_related(field: &str, id: Id) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.add(field, does_not_exist(id));
    errors
}

fn max_length_message(max: usize) -> String {
    format!("Ensure this field has no more than {} characters.", max)
}

/// Check an uploaded file is present, non-empty and a supported image
pub fn validate_image_file(file: Option<UploadedFile>) -> Result<ValidImage, &'static str> {
    let file = file.ok_or(NO_FILE)?;
    if file.bytes.is_empty() {
        return Err(EMPTY_FILE);
    }

    let info = probe_image(&file.bytes).map_err(|e| {
        tracing::debug!(error = %e, "Rejected uploaded file");
        INVALID_IMAGE
    })?;

    Ok(ValidImage {
        info,
        original_name: file.file_name,
        bytes: file.bytes,
    })
}

/// Validate the fields of a new project
pub fn validate_new_project(
    title: Option<String>,
    description: Option<String>,
) -> Result<NewProject, FieldErrors> {
    let mut errors = FieldErrors::new();
    check_title(title.as_deref(), false, &mut errors);
    check_description(description.as_deref(), &mut errors);

    match title {
        Some(title) if errors.is_empty() => Ok(NewProject { title, description }),
        _ => Err(errors),
    }
}

/// Validate a project update.
///
/// With `partial` unset the title is required; a present title must not be
/// blank. Both fields are checked against their length limits.
pub fn validate_project_changes(
    title: Option<String>,
    description: Option<String>,
    partial: bool,
) -> Result<ProjectChanges, FieldErrors> {
    let mut errors = FieldErrors::new();
    check_title(title.as_deref(), partial, &mut errors);
    check_description(description.as_deref(), &mut errors);
    errors.into_result()?;

    Ok(ProjectChanges { title, description })
}

/// Validate the multipart form that creates a project together with its image
pub fn validate_project_upload(mut form: MultipartForm) -> Result<ProjectUpload, FieldErrors> {
    let mut errors = FieldErrors::new();

    let title = form.raw_text(TITLE_FIELD).map(str::to_string);
    let description = form.raw_text(DESCRIPTION_FIELD).map(str::to_string);
    check_title(title.as_deref(), false, &mut errors);
    check_description(description.as_deref(), &mut errors);

    let image = take_image(&mut form, &mut errors);

    match (title, image) {
        (Some(title), Some(image)) if errors.is_empty() => Ok(ProjectUpload {
            project: NewProject { title, description },
            image,
        }),
        _ => Err(errors),
    }
}

/// Validate the multipart form that attaches a new image to a project
pub fn validate_image_upload(mut form: MultipartForm) -> Result<ImageUpload, FieldErrors> {
    let mut errors = FieldErrors::new();

    let project_id = parse_id(&form, PROJECT_FIELD, &mut errors);
    let image = take_image(&mut form, &mut errors);

    match (project_id, image) {
        (Some(project_id), Some(image)) if errors.is_empty() => {
            Ok(ImageUpload { project_id, image })
        }
        _ => Err(errors),
    }
}

/// Validate the multipart form that updates an image.
///
/// A full update requires both fields; a partial update only checks the
/// fields that were submitted.
pub fn validate_image_update(
    mut form: MultipartForm,
    partial: bool,
) -> Result<ImageUpdate, FieldErrors> {
    let mut errors = FieldErrors::new();

    let project_id = if partial && !form.contains(PROJECT_FIELD) {
        None
    } else {
        parse_id(&form, PROJECT_FIELD, &mut errors)
    };
    let image = if partial && !form.contains(IMAGE_FILE_FIELD) {
        None
    } else {
        take_image(&mut form, &mut errors)
    };

    errors.into_result()?;
    Ok(ImageUpdate { project_id, image })
}

/// Validate the fields of a new layer; missing properties default to `{}`
pub fn validate_new_layer(
    image: Option<Id>,
    layer_id: Option<i32>,
    shape_type: Option<String>,
    properties: Option<serde_json::Value>,
) -> Result<NewLayer, FieldErrors> {
    let mut errors = FieldErrors::new();
    require(image.is_some(), IMAGE_FIELD, &mut errors);
    require(layer_id.is_some(), LAYER_ID_FIELD, &mut errors);
    require(shape_type.is_some(), SHAPE_TYPE_FIELD, &mut errors);
    let shape_type = parse_shape(shape_type.as_deref(), &mut errors);
    check_layer_values(layer_id, properties.as_ref(), &mut errors);

    match (image, layer_id, shape_type) {
        (Some(image_id), Some(layer_id), Some(shape_type)) if errors.is_empty() => Ok(NewLayer {
            image_id,
            layer_id,
            shape_type,
            properties: properties.unwrap_or_else(empty_object),
        }),
        _ => Err(errors),
    }
}

/// Validate a layer update.
///
/// With `partial` unset `image`, `layer_id` and `shape_type` are required and
/// missing properties reset to `{}`.
pub fn validate_layer_changes(
    image: Option<Id>,
    layer_id: Option<i32>,
    shape_type: Option<String>,
    properties: Option<serde_json::Value>,
    partial: bool,
) -> Result<LayerChanges, FieldErrors> {
    let mut errors = FieldErrors::new();
    if !partial {
        require(image.is_some(), IMAGE_FIELD, &mut errors);
        require(layer_id.is_some(), LAYER_ID_FIELD, &mut errors);
        require(shape_type.is_some(), SHAPE_TYPE_FIELD, &mut errors);
    }
    let shape_type = parse_shape(shape_type.as_deref(), &mut errors);
    check_layer_values(layer_id, properties.as_ref(), &mut errors);
    errors.into_result()?;

    let properties = match properties {
        None if !partial => Some(empty_object()),
        other => other,
    };

    Ok(LayerChanges {
        image_id: image,
        layer_id,
        shape_type,
        properties,
    })
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

fn require(present: bool, field: &str, errors: &mut FieldErrors) {
    if !present {
        errors.add(field, REQUIRED);
    }
}

fn parse_shape(shape_type: Option<&str>, errors: &mut FieldErrors) -> Option<ShapeType> {
    match shape_type?.parse() {
        Ok(shape) => Some(shape),
        Err(message) => {
            errors.add(SHAPE_TYPE_FIELD, message);
            None
        }
    }
}

fn check_layer_values(
    layer_id: Option<i32>,
    properties: Option<&serde_json::Value>,
    errors: &mut FieldErrors,
) {
    if matches!(layer_id, Some(id) if id < 1) {
        errors.add(LAYER_ID_FIELD, "Ensure this value is greater than or equal to 1.");
    }
    if matches!(properties, Some(value) if !value.is_object()) {
        errors.add(PROPERTIES_FIELD, NOT_AN_OBJECT);
    }
}

fn check_title(title: Option<&str>, partial: bool, errors: &mut FieldErrors) {
    match title {
        None if !partial => errors.add(TITLE_FIELD, REQUIRED),
        None => {}
        Some(t) if t.trim().is_empty() => errors.add(TITLE_FIELD, BLANK),
        Some(t) if t.chars().count() > MAX_TITLE_LENGTH => {
            errors.add(TITLE_FIELD, max_length_message(MAX_TITLE_LENGTH))
        }
        Some(_) => {}
    }
}

fn check_description(description: Option<&str>, errors: &mut FieldErrors) {
    if let Some(d) = description {
        if d.chars().count() > MAX_DESCRIPTION_LENGTH {
            errors.add(DESCRIPTION_FIELD, max_length_message(MAX_DESCRIPTION_LENGTH));
        }
    }
}

fn parse_id(form: &MultipartForm, field: &str, errors: &mut FieldErrors) -> Option<Id> {
    let Some(raw) = form.text(field) else {
        errors.add(field, REQUIRED);
        return None;
    };
    match raw.trim().parse::<Id>() {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add(field, INCORRECT_PK_TYPE);
            None
        }
    }
}

fn take_image(form: &mut MultipartForm, errors: &mut FieldErrors) -> Option<ValidImage> {
    let file = form.take_file(IMAGE_FILE_FIELD);
    if file.is_none() && form.has_text(IMAGE_FILE_FIELD) {
        errors.add(IMAGE_FILE_FIELD, NOT_A_FILE);
        return None;
    }
    match validate_image_file(file) {
        Ok(image) => Some(image),
        Err(message) => {
            errors.add(IMAGE_FILE_FIELD, message);
            None
        }
    }
}
