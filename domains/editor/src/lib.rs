//! Editor domain: projects, their background image, and drawing layers

pub mod api;
pub mod domain;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use domain::entities::{Id, Image, ImageFile, Layer, Project, ShapeType, UNSAVED_ID};

// Re-export repository types
pub use repository::{
    EditorRepositories, ImageRepository, InMemoryEditorStore, LayerRepository, ProjectRepository,
};

// Re-export API types
pub use api::routes;
pub use api::EditorState;
