//! Project repository

use easel_common::RepositoryResult;
use sqlx::PgPool;

use super::transactions::{
    delete_image_tx, delete_layers_for_image_tx, delete_project_tx, find_image_by_project_tx,
    insert_image_tx, insert_project_tx, lock_project_tx,
};
use super::{DeletedProject, ProjectRepository};
use crate::domain::entities::{Id, Image, Project};

#[derive(Clone)]
pub struct PgProjectRepository {
    pool: PgPool,
}

impl PgProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProjectRepository for PgProjectRepository {
    async fn list(&self) -> RepositoryResult<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, title, description, created_at, updated_at
            FROM projects
            ORDER BY created_at DESC, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(projects)
    }

    async fn find(&self, id: Id) -> RepositoryResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, title, description, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(project)
    }

    async fn create(&self, project: &Project) -> RepositoryResult<Project> {
        let mut tx = self.pool.begin().await?;
        let created = insert_project_tx(&mut tx, project).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn create_with_image(
        &self,
        project: &Project,
        image: &Image,
    ) -> RepositoryResult<(Project, Image)> {
        let mut tx = self.pool.begin().await?;
        let created_project = insert_project_tx(&mut tx, project).await?;
        let image = Image {
            project_id: created_project.id,
            ..image.clone()
        };
        let created_image = insert_image_tx(&mut tx, &image).await?;
        tx.commit().await?;

        Ok((created_project, created_image))
    }

    async fn update(&self, project: &Project) -> RepositoryResult<Option<Project>> {
        let updated = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects SET
                title = $2,
                description = $3,
                updated_at = $4
            WHERE id = $1
            RETURNING id, title, description, created_at, updated_at
            "#,
        )
        .bind(project.id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(project.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete(&self, id: Id) -> RepositoryResult<Option<DeletedProject>> {
        let mut tx = self.pool.begin().await?;

        if !lock_project_tx(&mut tx, id).await? {
            tx.rollback().await?;
            return Ok(None);
        }

        // Children first: the schema restricts deletes of referenced rows
        let image = find_image_by_project_tx(&mut tx, id).await?;
        let mut layers_deleted = 0;
        if let Some(ref image) = image {
            layers_deleted = delete_layers_for_image_tx(&mut tx, image.id).await?;
            delete_image_tx(&mut tx, image.id).await?;
        }

        delete_project_tx(&mut tx, id).await?;
        tx.commit().await?;

        Ok(Some(DeletedProject {
            image,
            layers_deleted,
        }))
    }
}
