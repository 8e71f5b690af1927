//! Repository implementations for the Editor domain
//!
//! Each aggregate has a trait with a PostgreSQL implementation and an
//! in-memory one that enforces the same constraints (one image per project,
//! restricted deletes of referenced rows).

pub mod images;
pub mod layers;
pub mod memory;
pub mod projects;
pub mod transactions;

use std::sync::Arc;

use easel_common::RepositoryResult;
use sqlx::PgPool;

use crate::domain::entities::{Id, Image, Layer, Project};

pub use images::PgImageRepository;
pub use layers::PgLayerRepository;
pub use memory::InMemoryEditorStore;
pub use projects::PgProjectRepository;

/// What a project delete removed along with the project row
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedProject {
    pub image: Option<Image>,
    pub layers_deleted: u64,
}

#[async_trait::async_trait]
pub trait ProjectRepository: Send + Sync {
    /// All projects, newest first
    async fn list(&self) -> RepositoryResult<Vec<Project>>;

    async fn find(&self, id: Id) -> RepositoryResult<Option<Project>>;

    async fn create(&self, project: &Project) -> RepositoryResult<Project>;

    /// Insert a project and its image in one transaction. The image is
    /// linked to the newly assigned project id.
    async fn create_with_image(
        &self,
        project: &Project,
        image: &Image,
    ) -> RepositoryResult<(Project, Image)>;

    /// Persist the current state of a project; `None` if it no longer exists
    async fn update(&self, project: &Project) -> RepositoryResult<Option<Project>>;

    /// Delete a project with its image and that image's layers in one
    /// transaction; `None` if the project does not exist
    async fn delete(&self, id: Id) -> RepositoryResult<Option<DeletedProject>>;
}

#[async_trait::async_trait]
pub trait ImageRepository: Send + Sync {
    /// All images, newest first
    async fn list(&self) -> RepositoryResult<Vec<Image>>;

    async fn find(&self, id: Id) -> RepositoryResult<Option<Image>>;

    async fn find_by_project(&self, project_id: Id) -> RepositoryResult<Option<Image>>;

    /// Images attached to any of the given projects
    async fn list_by_projects(&self, project_ids: &[Id]) -> RepositoryResult<Vec<Image>>;

    /// Insert an image; a second image for the same project is
    /// `RepositoryError::AlreadyExists`
    async fn create(&self, image: &Image) -> RepositoryResult<Image>;

    /// Persist the current state of an image; `None` if it no longer exists
    async fn update(&self, image: &Image) -> RepositoryResult<Option<Image>>;

    /// Delete an image and every layer referencing it in one transaction.
    /// Returns the number of layers removed, or `None` if the image does not
    /// exist.
    async fn delete_with_layers(&self, id: Id) -> RepositoryResult<Option<u64>>;
}

#[async_trait::async_trait]
pub trait LayerRepository: Send + Sync {
    /// Layers ordered by `(layer_id, created_at)`, optionally for one image
    async fn list(&self, image_id: Option<Id>) -> RepositoryResult<Vec<Layer>>;

    /// Layers drawn on any of the given images, same ordering as `list`
    async fn list_by_images(&self, image_ids: &[Id]) -> RepositoryResult<Vec<Layer>>;

    async fn find(&self, id: Id) -> RepositoryResult<Option<Layer>>;

    async fn create(&self, layer: &Layer) -> RepositoryResult<Layer>;

    async fn update(&self, layer: &Layer) -> RepositoryResult<Option<Layer>>;

    async fn delete(&self, id: Id) -> RepositoryResult<bool>;
}

/// Combined repository access for the Editor domain
#[derive(Clone)]
pub struct EditorRepositories {
    pub projects: Arc<dyn ProjectRepository>,
    pub images: Arc<dyn ImageRepository>,
    pub layers: Arc<dyn LayerRepository>,
}

impl EditorRepositories {
    /// Repositories backed by PostgreSQL
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            projects: Arc::new(PgProjectRepository::new(pool.clone())),
            images: Arc::new(PgImageRepository::new(pool.clone())),
            layers: Arc::new(PgLayerRepository::new(pool)),
        }
    }

    /// Repositories sharing one in-memory store
    pub fn in_memory(store: InMemoryEditorStore) -> Self {
        Self {
            projects: Arc::new(store.clone()),
            images: Arc::new(store.clone()),
            layers: Arc::new(store),
        }
    }
}
