//! Project API handlers

use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use easel_common::{Error, MultipartForm, ResourcePath, Result, ValidatedJson};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::images::{image_responses, ImageResponse};
use super::{discard_file, image_write_error, store_upload, PROJECT_NOT_FOUND};
use crate::api::middleware::EditorState;
use crate::domain::entities::{Id, Image, Project};
use crate::domain::validation::{
    validate_new_project, validate_project_changes, validate_project_upload,
};

/// Request body for creating or updating a project
#[derive(Debug, Deserialize, Validate)]
pub struct ProjectRequest {
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub title: Option<String>,

    #[validate(length(
        max = 5000,
        message = "Ensure this field has no more than 5000 characters."
    ))]
    pub description: Option<String>,
}

/// Project response DTO
#[derive(Debug, Clone, Serialize)]
pub struct ProjectResponse {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub image: Option<ImageResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectResponse {
    pub fn new(project: Project, image: Option<ImageResponse>) -> Self {
        Self {
            id: project.id,
            title: project.title,
            description: project.description,
            image,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

/// Build responses for several projects with their nested image and layers
async fn project_responses(
    state: &EditorState,
    projects: Vec<Project>,
) -> Result<Vec<ProjectResponse>> {
    let ids: Vec<Id> = projects.iter().map(|p| p.id).collect();
    let images = state.repos.images.list_by_projects(&ids).await?;

    let mut image_by_project: HashMap<Id, ImageResponse> = image_responses(state, images)
        .await?
        .into_iter()
        .map(|image| (image.project, image))
        .collect();

    Ok(projects
        .into_iter()
        .map(|project| {
            let image = image_by_project.remove(&project.id);
            ProjectResponse::new(project, image)
        })
        .collect())
}

async fn project_response(state: &EditorState, project: Project) -> Result<ProjectResponse> {
    let mut responses = project_responses(state, vec![project]).await?;
    responses
        .pop()
        .ok_or_else(|| Error::Internal("project response missing".to_string()))
}

async fn find_project(state: &EditorState, id: Id) -> Result<Project> {
    state
        .repos
        .projects
        .find(id)
        .await?
        .ok_or_else(|| Error::NotFound(PROJECT_NOT_FOUND.to_string()))
}

/// List all projects with their image
pub async fn list_projects(
    State(state): State<EditorState>,
) -> Result<Json<Vec<ProjectResponse>>> {
    let projects = state.repos.projects.list().await?;
    Ok(Json(project_responses(&state, projects).await?))
}

/// Create a project without an image
pub async fn create_project(
    State(state): State<EditorState>,
    ValidatedJson(req): ValidatedJson<ProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>)> {
    let new = validate_new_project(req.title, req.description)?;
    let project = Project::new(new.title, new.description)?;
    let created = state.repos.projects.create(&project).await?;

    tracing::info!(project_id = %created.id, "Project created");
    Ok((StatusCode::CREATED, Json(ProjectResponse::new(created, None))))
}

/// Get a single project by ID
pub async fn get_project(
    State(state): State<EditorState>,
    ResourcePath(id): ResourcePath<Id>,
) -> Result<Json<ProjectResponse>> {
    let project = find_project(&state, id).await?;
    Ok(Json(project_response(&state, project).await?))
}

/// Replace a project (PUT, title required)
pub async fn update_project(
    State(state): State<EditorState>,
    ResourcePath(id): ResourcePath<Id>,
    ValidatedJson(req): ValidatedJson<ProjectRequest>,
) -> Result<Json<ProjectResponse>> {
    save_project(state, id, req, false).await
}

/// Partially update a project (PATCH)
pub async fn patch_project(
    State(state): State<EditorState>,
    ResourcePath(id): ResourcePath<Id>,
    ValidatedJson(req): ValidatedJson<ProjectRequest>,
) -> Result<Json<ProjectResponse>> {
    save_project(state, id, req, true).await
}

async fn save_project(
    state: EditorState,
    id: Id,
    req: ProjectRequest,
    partial: bool,
) -> Result<Json<ProjectResponse>> {
    let mut project = find_project(&state, id).await?;
    let changes = validate_project_changes(req.title, req.description, partial)?;

    project.apply(changes)?;
    let updated = state
        .repos
        .projects
        .update(&project)
        .await?
        .ok_or_else(|| Error::NotFound(PROJECT_NOT_FOUND.to_string()))?;

    Ok(Json(project_response(&state, updated).await?))
}

/// Delete a project together with its image and that image's layers
pub async fn delete_project(
    State(state): State<EditorState>,
    ResourcePath(id): ResourcePath<Id>,
) -> Result<StatusCode> {
    let deleted = state
        .repos
        .projects
        .delete(id)
        .await?
        .ok_or_else(|| Error::NotFound(PROJECT_NOT_FOUND.to_string()))?;

    if let Some(ref image) = deleted.image {
        discard_file(&state, &image.file_path).await;
    }

    tracing::info!(
        project_id = %id,
        had_image = deleted.image.is_some(),
        layers_deleted = deleted.layers_deleted,
        "Project deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Create a project and its image in one step
/// (multipart `title`, `description`, `image_file`)
pub async fn upload_project_with_image(
    State(state): State<EditorState>,
    form: MultipartForm,
) -> Result<(StatusCode, Json<ProjectResponse>)> {
    let upload = validate_project_upload(form)?;
    let project = Project::new(upload.project.title, upload.project.description)?;

    let file = store_upload(&state, &upload.image).await?;
    let path = file.path.clone();

    let image = match Image::new(project.id, file) {
        Ok(image) => image,
        Err(e) => {
            discard_file(&state, &path).await;
            return Err(e);
        }
    };

    let (project, image) = match state
        .repos
        .projects
        .create_with_image(&project, &image)
        .await
    {
        Ok(created) => created,
        Err(e) => {
            discard_file(&state, &path).await;
            return Err(image_write_error(e));
        }
    };

    tracing::info!(
        project_id = %project.id,
        image_id = %image.id,
        "Project created with image"
    );
    let image = ImageResponse::new(image, Vec::new(), state.media.as_ref());
    Ok((
        StatusCode::CREATED,
        Json(ProjectResponse::new(project, Some(image))),
    ))
}
