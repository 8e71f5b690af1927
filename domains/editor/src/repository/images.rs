//! Image repository

use easel_common::RepositoryResult;
use sqlx::PgPool;

use super::transactions::{delete_image_tx, delete_layers_for_image_tx, insert_image_tx};
use super::ImageRepository;
use crate::domain::entities::{Id, Image};

#[derive(Clone)]
pub struct PgImageRepository {
    pool: PgPool,
}

impl PgImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ImageRepository for PgImageRepository {
    async fn list(&self) -> RepositoryResult<Vec<Image>> {
        let images = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, project_id, file_path, original_name, content_type,
                   size_bytes, width, height, uploaded_at, updated_at
            FROM images
            ORDER BY uploaded_at DESC, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    async fn find(&self, id: Id) -> RepositoryResult<Option<Image>> {
        let image = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, project_id, file_path, original_name, content_type,
                   size_bytes, width, height, uploaded_at, updated_at
            FROM images
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(image)
    }

    async fn find_by_project(&self, project_id: Id) -> RepositoryResult<Option<Image>> {
        let image = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, project_id, file_path, original_name, content_type,
                   size_bytes, width, height, uploaded_at, updated_at
            FROM images
            WHERE project_id = $1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(image)
    }

    async fn list_by_projects(&self, project_ids: &[Id]) -> RepositoryResult<Vec<Image>> {
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }

        let images = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, project_id, file_path, original_name, content_type,
                   size_bytes, width, height, uploaded_at, updated_at
            FROM images
            WHERE project_id = ANY($1)
            "#,
        )
        .bind(project_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    async fn create(&self, image: &Image) -> RepositoryResult<Image> {
        let mut tx = self.pool.begin().await?;
        let created = insert_image_tx(&mut tx, image).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn update(&self, image: &Image) -> RepositoryResult<Option<Image>> {
        let updated = sqlx::query_as::<_, Image>(
            r#"
            UPDATE images SET
                project_id = $2,
                file_path = $3,
                original_name = $4,
                content_type = $5,
                size_bytes = $6,
                width = $7,
                height = $8,
                updated_at = $9
            WHERE id = $1
            RETURNING id, project_id, file_path, original_name, content_type,
                      size_bytes, width, height, uploaded_at, updated_at
            "#,
        )
        .bind(image.id)
        .bind(image.project_id)
        .bind(&image.file_path)
        .bind(&image.original_name)
        .bind(&image.content_type)
        .bind(image.size_bytes)
        .bind(image.width)
        .bind(image.height)
        .bind(image.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete_with_layers(&self, id: Id) -> RepositoryResult<Option<u64>> {
        let mut tx = self.pool.begin().await?;

        let layers_deleted = delete_layers_for_image_tx(&mut tx, id).await?;
        if !delete_image_tx(&mut tx, id).await? {
            tx.rollback().await?;
            return Ok(None);
        }
        tx.commit().await?;

        Ok(Some(layers_deleted))
    }
}
