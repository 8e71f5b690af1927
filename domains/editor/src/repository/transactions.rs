//! Transaction helpers for multi-row editor operations
//!
//! Foreign keys are `ON DELETE RESTRICT`, so every cascade is spelled out
//! here: layers first, then the image, then the project.

use easel_common::RepositoryResult;
use sqlx::{Postgres, Transaction};
use crate::domain::entities::{Id, Image, Project};

/// Insert a project within an existing transaction; the store assigns the id
pub async fn insert_project_tx(
    tx: &mut Transaction<'_, Postgres>,
    project: &Project,
) -> RepositoryResult<Project> {
    let created = sqlx::query_as::<_, Project>(
        r#"
        INSERT INTO projects (title, description, created_at, updated_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, title, description, created_at, updated_at
        "#,
    )
    .bind(&project.title)
    .bind(&project.description)
    .bind(project.created_at)
    .bind(project.updated_at)
    .fetch_one(&mut **tx)
    .await?;

    Ok(created)
}

/// Insert an image within an existing transaction.
///
/// A second image for the same project violates `images_project_id_key` and
/// comes back as `RepositoryError::AlreadyExists`.
pub async fn insert_image_tx(
    tx: &mut Transaction<'_, Postgres>,
    image: &Image,
) -> RepositoryResult<Image> {
    let created = sqlx::query_as::<_, Image>(
        r#"
        INSERT INTO images (
            project_id, file_path, original_name, content_type,
            size_bytes, width, height, uploaded_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, project_id, file_path, original_name, content_type,
                  size_bytes, width, height, uploaded_at, updated_at
        "#,
    )
    .bind(image.project_id)
    .bind(&image.file_path)
    .bind(&image.original_name)
    .bind(&image.content_type)
    .bind(image.size_bytes)
    .bind(image.width)
    .bind(image.height)
    .bind(image.uploaded_at)
    .bind(image.updated_at)
    .fetch_one(&mut **tx)
    .await?;

    Ok(created)
}

/// Lock a project row so concurrent image uploads wait for the delete.
/// Returns `false` if the project does not exist.
pub async fn lock_project_tx(
    tx: &mut Transaction<'_, Postgres>,
    project_id: Id,
) -> RepositoryResult<bool> {
    let locked = sqlx::query_scalar::<_, Id>("SELECT id FROM projects WHERE id = $1 FOR UPDATE")
        .bind(project_id)
        .fetch_optional(&mut **tx)
        .await?;

    Ok(locked.is_some())
}

/// Lock and return the image attached to a project, if any
pub async fn find_image_by_project_tx(
    tx: &mut Transaction<'_, Postgres>,
    project_id: Id,
) -> RepositoryResult<Option<Image>> {
    let image = sqlx::query_as::<_, Image>(
        r#"
        SELECT id, project_id, file_path, original_name, content_type,
               size_bytes, width, height, uploaded_at, updated_at
        FROM images
        WHERE project_id = $1
        FOR UPDATE
        "#,
    )
    .bind(project_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(image)
}

/// Delete every layer drawn on an image, returning how many were removed
pub async fn delete_layers_for_image_tx(
    tx: &mut Transaction<'_, Postgres>,
    image_id: Id,
) -> RepositoryResult<u64> {
    let result = sqlx::query("DELETE FROM layers WHERE image_id = $1")
        .bind(image_id)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected())
}

/// Delete an image row; layers must already be gone
pub async fn delete_image_tx(
    tx: &mut Transaction<'_, Postgres>,
    image_id: Id,
) -> RepositoryResult<bool> {
    let result = sqlx::query("DELETE FROM images WHERE id = $1")
        .bind(image_id)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a project row; its image must already be gone
pub async fn delete_project_tx(
    tx: &mut Transaction<'_, Postgres>,
    project_id: Id,
) -> RepositoryResult<bool> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(project_id)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected() > 0)
}
