//! Layer repository

use easel_common::RepositoryResult;
use sqlx::PgPool;

use super::LayerRepository;
use crate::domain::entities::{Id, Layer};

#[derive(Clone)]
pub struct PgLayerRepository {
    pool: PgPool,
}

impl PgLayerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LayerRepository for PgLayerRepository {
    async fn list(&self, image_id: Option<Id>) -> RepositoryResult<Vec<Layer>> {
        let layers = match image_id {
            Some(image_id) => {
                sqlx::query_as::<_, Layer>(
                    r#"
                    SELECT id, image_id, layer_id, shape_type, properties,
                           created_at, updated_at
                    FROM layers
                    WHERE image_id = $1
                    ORDER BY layer_id, created_at
                    "#,
                )
                .bind(image_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Layer>(
                    r#"
                    SELECT id, image_id, layer_id, shape_type, properties,
                           created_at, updated_at
                    FROM layers
                    ORDER BY layer_id, created_at
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(layers)
    }

    async fn list_by_images(&self, image_ids: &[Id]) -> RepositoryResult<Vec<Layer>> {
        if image_ids.is_empty() {
            return Ok(Vec::new());
        }

        let layers = sqlx::query_as::<_, Layer>(
            r#"
            SELECT id, image_id, layer_id, shape_type, properties,
                   created_at, updated_at
            FROM layers
            WHERE image_id = ANY($1)
            ORDER BY layer_id, created_at
            "#,
        )
        .bind(image_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(layers)
    }

    async fn find(&self, id: Id) -> RepositoryResult<Option<Layer>> {
        let layer = sqlx::query_as::<_, Layer>(
            r#"
            SELECT id, image_id, layer_id, shape_type, properties,
                   created_at, updated_at
            FROM layers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(layer)
    }

    async fn create(&self, layer: &Layer) -> RepositoryResult<Layer> {
        let created = sqlx::query_as::<_, Layer>(
            r#"
            INSERT INTO layers (
                image_id, layer_id, shape_type, properties,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, image_id, layer_id, shape_type, properties,
                      created_at, updated_at
            "#,
        )
        .bind(layer.image_id)
        .bind(layer.layer_id)
        .bind(layer.shape_type)
        .bind(&layer.properties)
        .bind(layer.created_at)
        .bind(layer.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update(&self, layer: &Layer) -> RepositoryResult<Option<Layer>> {
        let updated = sqlx::query_as::<_, Layer>(
            r#"
            UPDATE layers SET
                image_id = $2,
                layer_id = $3,
                shape_type = $4,
                properties = $5,
                updated_at = $6
            WHERE id = $1
            RETURNING id, image_id, layer_id, shape_type, properties,
                      created_at, updated_at
            "#,
        )
        .bind(layer.id)
        .bind(layer.image_id)
        .bind(layer.layer_id)
        .bind(layer.shape_type)
        .bind(&layer.properties)
        .bind(layer.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete(&self, id: Id) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM layers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
