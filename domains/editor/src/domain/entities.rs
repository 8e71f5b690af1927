//! Domain entities for the Editor domain
//!
//! A project owns at most one background image; an image carries the vector
//! layers drawn on top of it. Each entity validates its own invariants on
//! construction and on every change.
//!
//! Keys are `BIGSERIAL` columns. A freshly constructed entity carries
//! [`UNSAVED_ID`] until a repository inserts it and returns the stored row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use easel_common::{Error, Result};
use easel_media::ImageInfo;

/// Primary key of every editor table
pub type Id = i64;

/// Id of an entity that has not been inserted yet
pub const UNSAVED_ID: Id = 0;

/// Maximum project title length (varchar(255))
pub const MAX_TITLE_LENGTH: usize = 255;

/// Maximum project description length (CHECK length <= 5000)
pub const MAX_DESCRIPTION_LENGTH: usize = 5000;

/// Maximum stored original filename length (varchar(255))
pub const MAX_ORIGINAL_NAME_LENGTH: usize = 255;

/// Kind of vector shape a layer draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "shape_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Circle,
    Line,
}

impl std::fmt::Display for ShapeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeType::Circle => write!(f, "circle"),
            ShapeType::Line => write!(f, "line"),
        }
    }
}

impl std::str::FromStr for ShapeType {
    type Err = String;

    /// Parse a wire value; the error is the field message for the client
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "circle" => Ok(ShapeType::Circle),
            "line" => Ok(ShapeType::Line),
            other => Err(format!("\"{}\" is not a valid choice.", other)),
        }
    }
}

/// Project entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a project; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectChanges {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Project {
    /// Create a new project with validation
    pub fn new(title: String, description: Option<String>) -> Result<Self> {
        let description = description.unwrap_or_default();
        Self::validate_title(&title)?;
        Self::validate_description(&description)?;

        let now = Utc::now();
        Ok(Project {
            id: UNSAVED_ID,
            title,
            description,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update, validating every changed field first
    pub fn apply(&mut self, changes: ProjectChanges) -> Result<()> {
        if let Some(ref title) = changes.title {
            Self::validate_title(title)?;
        }
        if let Some(ref description) = changes.description {
            Self::validate_description(description)?;
        }

        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Validate title (required, non-blank, varchar(255))
    fn validate_title(title: &str) -> Result<()> {
        if title.trim().is_empty() {
            return Err(Error::Validation("Project title cannot be blank".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(Error::Validation(format!(
                "Project title must be at most {} characters",
                MAX_TITLE_LENGTH
            )));
        }
        Ok(())
    }

    fn validate_description(description: &str) -> Result<()> {
        if description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(Error::Validation(format!(
                "Project description must be at most {} characters",
                MAX_DESCRIPTION_LENGTH
            )));
        }
        Ok(())
    }
}

/// A stored image file and the metadata read from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub path: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub width: i32,
    pub height: i32,
}

impl ImageFile {
    /// Describe a file already written to media storage
    pub fn new(
        path: String,
        original_name: Option<&str>,
        info: &ImageInfo,
        size_bytes: usize,
    ) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::Validation("Image path is required".to_string()));
        }

        let original_name = match original_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.chars().take(MAX_ORIGINAL_NAME_LENGTH).collect(),
            None => path.rsplit('/').next().unwrap_or(&path).to_string(),
        };

        let size_bytes = i64::try_from(size_bytes)
            .map_err(|_| Error::Validation("Image is too large".to_string()))?;
        let width = i32::try_from(info.width)
            .map_err(|_| Error::Validation("Image is too wide".to_string()))?;
        let height = i32::try_from(info.height)
            .map_err(|_| Error::Validation("Image is too tall".to_string()))?;

        Ok(ImageFile {
            path,
            original_name,
            content_type: info.kind.mime_type().to_string(),
            size_bytes,
            width,
            height,
        })
    }
}

/// Image entity: the background picture of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Image {
    pub id: Id,
    pub project_id: Id,
    pub file_path: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub width: i32,
    pub height: i32,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Image {
    /// Create a new image attached to a project
    pub fn new(project_id: Id, file: ImageFile) -> Result<Self> {
        Self::validate_file(&file)?;

        let now = Utc::now();
        Ok(Image {
            id: UNSAVED_ID,
            project_id,
            file_path: file.path,
            original_name: file.original_name,
            content_type: file.content_type,
            size_bytes: file.size_bytes,
            width: file.width,
            height: file.height,
            uploaded_at: now,
            updated_at: now,
        })
    }

    /// Swap in a newly stored file, returning the path of the previous one
    pub fn replace_file(&mut self, file: ImageFile) -> Result<String> {
        Self::validate_file(&file)?;

        let previous = std::mem::replace(&mut self.file_path, file.path);
        self.original_name = file.original_name;
        self.content_type = file.content_type;
        self.size_bytes = file.size_bytes;
        self.width = file.width;
        self.height = file.height;
        self.updated_at = Utc::now();
        Ok(previous)
    }

    /// Re-attach the image to another project
    pub fn move_to(&mut self, project_id: Id) {
        if self.project_id != project_id {
            self.project_id = project_id;
            self.updated_at = Utc::now();
        }
    }

    /// Validate file metadata (CHECK size_bytes > 0, width > 0, height > 0)
    fn validate_file(file: &ImageFile) -> Result<()> {
        if file.path.is_empty() {
            return Err(Error::Validation("Image path is required".to_string()));
        }
        if file.size_bytes <= 0 {
            return Err(Error::Validation("Image file cannot be empty".to_string()));
        }
        if file.width <= 0 || file.height <= 0 {
            return Err(Error::Validation(
                "Image dimensions must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Layer entity: one vector shape drawn over an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Layer {
    pub id: Id,
    pub image_id: Id,
    pub layer_id: i32,
    pub shape_type: ShapeType,
    pub properties: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a layer; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerChanges {
    pub image_id: Option<Id>,
    pub layer_id: Option<i32>,
    pub shape_type: Option<ShapeType>,
    pub properties: Option<serde_json::Value>,
}

impl Layer {
    /// Create a new layer
    pub fn new(
        image_id: Id,
        layer_id: i32,
        shape_type: ShapeType,
        properties: serde_json::Value,
    ) -> Result<Self> {
        Self::validate_layer_id(layer_id)?;
        Self::validate_properties(&properties)?;

        let now = Utc::now();
        Ok(Layer {
            id: UNSAVED_ID,
            image_id,
            layer_id,
            shape_type,
            properties: Json(properties),
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update, validating every changed field first
    pub fn apply(&mut self, changes: LayerChanges) -> Result<()> {
        if let Some(layer_id) = changes.layer_id {
            Self::validate_layer_id(layer_id)?;
        }
        if let Some(ref properties) = changes.properties {
            Self::validate_properties(properties)?;
        }

        if let Some(image_id) = changes.image_id {
            self.image_id = image_id;
        }
        if let Some(layer_id) = changes.layer_id {
            self.layer_id = layer_id;
        }
        if let Some(shape_type) = changes.shape_type {
            self.shape_type = shape_type;
        }
        if let Some(properties) = changes.properties {
            self.properties = Json(properties);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Validate layer ordinal (CHECK (layer_id >= 1))
    fn validate_layer_id(layer_id: i32) -> Result<()> {
        if layer_id < 1 {
            return Err(Error::Validation(
                "Layer id must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate properties (CHECK (jsonb_typeof(properties) = 'object'))
    fn validate_properties(properties: &serde_json::Value) -> Result<()> {
        if !properties.is_object() {
            return Err(Error::Validation(
                "Layer properties must be a JSON object".to_string(),
            ));
        }
        Ok(())
    }
}
