//! In-memory editor store
//!
//! Backs the test suites. Enforces the same constraints as the schema: a
//! unique `images.project_id` and foreign keys that must resolve. Deletes
//! always remove children first, as the PostgreSQL transactions do. Ids
//! come from per-table sequences starting at 1, like `BIGSERIAL`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use easel_common::{RepositoryError, RepositoryResult};

use super::{DeletedProject, ImageRepository, LayerRepository, ProjectRepository};
use crate::domain::entities::{Id, Image, Layer, Project};

#[derive(Debug, Default)]
struct Tables {
    projects: HashMap<Id, Project>,
    images: HashMap<Id, Image>,
    layers: HashMap<Id, Layer>,
    project_seq: Id,
    image_seq: Id,
    layer_seq: Id,
}

fn next_id(seq: &mut Id) -> Id {
    *seq += 1;
    *seq
}

impl Tables {

    /// Constraints for writing `image`, ignoring the row it replaces
    fn check_image_write(&self, image: &Image, projects_pending: &[Id]) -> RepositoryResult<()> {
        if !self.projects.contains_key(&image.project_id)
            && !projects_pending.contains(&image.project_id)
        {
            return Err(fk_violation("images_project_id_fkey"));
        }
        let taken = self
            .images
            .values()
            .any(|other| other.project_id == image.project_id && other.id != image.id);
        if taken {
            return Err(RepositoryError::AlreadyExists);
        }
        Ok(())
    }

    fn check_layer_write(&self, layer: &Layer) -> RepositoryResult<()> {
        if !self.images.contains_key(&layer.image_id) {
            return Err(fk_violation("layers_image_id_fkey"));
        }
        Ok(())
    }

    fn image_for_project(&self, project_id: Id) -> Option<&Image> {
        self.images.values().find(|i| i.project_id == project_id)
    }

    fn delete_layers_for_image(&mut self, image_id: Id) -> u64 {
        let before = self.layers.len();
        self.layers.retain(|_, layer| layer.image_id != image_id);
        (before - self.layers.len()) as u64
    }
}

fn fk_violation(constraint: &str) -> RepositoryError {
    RepositoryError::InvalidData(format!(
        "Referenced record does not exist ({})",
        constraint
    ))
}

fn sort_layers(layers: &mut [Layer]) {
    layers.sort_by(|a, b| {
        a.layer_id
            .cmp(&b.layer_id)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}

/// Shared in-memory tables; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct InMemoryEditorStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryEditorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn project_count(&self) -> usize {
        self.tables().projects.len()
    }

    pub fn image_count(&self) -> usize {
        self.tables().images.len()
    }

    pub fn layer_count(&self) -> usize {
        self.tables().layers.len()
    }
}

#[async_trait::async_trait]
impl ProjectRepository for InMemoryEditorStore {
    async fn list(&self) -> RepositoryResult<Vec<Project>> {
        let mut projects: Vec<Project> = self.tables().projects.values().cloned().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(projects)
    }

    async fn find(&self, id: Id) -> RepositoryResult<Option<Project>> {
        Ok(self.tables().projects.get(&id).cloned())
    }

    async fn create(&self, project: &Project) -> RepositoryResult<Project> {
        let mut tables = self.tables();
        let stored = Project {
            id: next_id(&mut tables.project_seq),
            ..project.clone()
        };
        tables.projects.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn create_with_image(
        &self,
        project: &Project,
        image: &Image,
    ) -> RepositoryResult<(Project, Image)> {
        let mut tables = self.tables();
        let project_id = tables.project_seq + 1;
        let mut stored_image = Image {
            project_id,
            ..image.clone()
        };
        tables.check_image_write(&stored_image, &[project_id])?;

        let stored_project = Project {
            id: next_id(&mut tables.project_seq),
            ..project.clone()
        };
        stored_image.id = next_id(&mut tables.image_seq);
        tables.projects.insert(stored_project.id, stored_project.clone());
        tables.images.insert(stored_image.id, stored_image.clone());
        Ok((stored_project, stored_image))
    }

    async fn update(&self, project: &Project) -> RepositoryResult<Option<Project>> {
        let mut tables = self.tables();
        match tables.projects.get_mut(&project.id) {
            Some(existing) => {
                existing.title = project.title.clone();
                existing.description = project.description.clone();
                existing.updated_at = project.updated_at;
                Ok(Some(existing.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Id) -> RepositoryResult<Option<DeletedProject>> {
        let mut tables = self.tables();
        if !tables.projects.contains_key(&id) {
            return Ok(None);
        }

        let image = tables.image_for_project(id).cloned();
        let mut layers_deleted = 0;
        if let Some(ref image) = image {
            layers_deleted = tables.delete_layers_for_image(image.id);
            tables.images.remove(&image.id);
        }
        tables.projects.remove(&id);

        Ok(Some(DeletedProject {
            image,
            layers_deleted,
        }))
    }
}

#[async_trait::async_trait]
impl ImageRepository for InMemoryEditorStore {
    async fn list(&self) -> RepositoryResult<Vec<Image>> {
        let mut images: Vec<Image> = self.tables().images.values().cloned().collect();
        images.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(a.id.cmp(&b.id)));
        Ok(images)
    }

    async fn find(&self, id: Id) -> RepositoryResult<Option<Image>> {
        Ok(self.tables().images.get(&id).cloned())
    }

    async fn find_by_project(&self, project_id: Id) -> RepositoryResult<Option<Image>> {
        Ok(self.tables().image_for_project(project_id).cloned())
    }

    async fn list_by_projects(&self, project_ids: &[Id]) -> RepositoryResult<Vec<Image>> {
        Ok(self
            .tables()
            .images
            .values()
            .filter(|i| project_ids.contains(&i.project_id))
            .cloned()
            .collect())
    }

    async fn create(&self, image: &Image) -> RepositoryResult<Image> {
        let mut tables = self.tables();
        tables.check_image_write(image, &[])?;
        let stored = Image {
            id: next_id(&mut tables.image_seq),
            ..image.clone()
        };
        tables.images.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, image: &Image) -> RepositoryResult<Option<Image>> {
        let mut tables = self.tables();
        if !tables.images.contains_key(&image.id) {
            return Ok(None);
        }
        tables.check_image_write(image, &[])?;

        let mut stored = image.clone();
        if let Some(existing) = tables.images.get(&image.id) {
            stored.uploaded_at = existing.uploaded_at;
        }
        tables.images.insert(image.id, stored.clone());
        Ok(Some(stored))
    }

    async fn delete_with_layers(&self, id: Id) -> RepositoryResult<Option<u64>> {
        let mut tables = self.tables();
        if !tables.images.contains_key(&id) {
            return Ok(None);
        }

        let layers_deleted = tables.delete_layers_for_image(id);
        tables.images.remove(&id);
        Ok(Some(layers_deleted))
    }
}

#[async_trait::async_trait]
impl LayerRepository for InMemoryEditorStore {
    async fn list(&self, image_id: Option<Id>) -> RepositoryResult<Vec<Layer>> {
        let mut layers: Vec<Layer> = self
            .tables()
            .layers
            .values()
            .filter(|l| image_id.map_or(true, |id| l.image_id == id))
            .cloned()
            .collect();
        sort_layers(&mut layers);
        Ok(layers)
    }

    async fn list_by_images(&self, image_ids: &[Id]) -> RepositoryResult<Vec<Layer>> {
        let mut layers: Vec<Layer> = self
            .tables()
            .layers
            .values()
            .filter(|l| image_ids.contains(&l.image_id))
            .cloned()
            .collect();
        sort_layers(&mut layers);
        Ok(layers)
    }

    async fn find(&self, id: Id) -> RepositoryResult<Option<Layer>> {
        Ok(self.tables().layers.get(&id).cloned())
    }

    async fn create(&self, layer: &Layer) -> RepositoryResult<Layer> {
        let mut tables = self.tables();
        tables.check_layer_write(layer)?;
        let stored = Layer {
            id: next_id(&mut tables.layer_seq),
            ..layer.clone()
        };
        tables.layers.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, layer: &Layer) -> RepositoryResult<Option<Layer>> {
        let mut tables = self.tables();
        if !tables.layers.contains_key(&layer.id) {
            return Ok(None);
        }
        tables.check_layer_write(layer)?;

        let mut stored = layer.clone();
        if let Some(existing) = tables.layers.get(&layer.id) {
            stored.created_at = existing.created_at;
        }
        tables.layers.insert(layer.id, stored.clone());
        Ok(Some(stored))
    }

    async fn delete(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.tables().layers.remove(&id).is_some())
    }
}
