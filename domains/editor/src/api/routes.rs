//! Route definitions for Editor domain API
//!
//! Paths keep their trailing slash. Static segments such as `upload/` are
//! matched ahead of the `{id}` captures by axum's router.

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers::{images, layers, projects};
use super::middleware::EditorState;

/// Create project routes
fn project_routes() -> Router<EditorState> {
    Router::new()
        .route(
            "/projects/",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/projects/upload/", post(projects::upload_project_with_image))
        .route(
            "/projects/{id}/",
            get(projects::get_project)
                .put(projects::update_project)
                .patch(projects::patch_project)
                .delete(projects::delete_project),
        )
}

/// Create image routes
fn image_routes() -> Router<EditorState> {
    Router::new()
        .route("/images/", get(images::list_images).post(images::create_image))
        .route("/images/upload-to-project/", post(images::upload_to_project))
        .route(
            "/images/{id}/",
            get(images::get_image)
                .put(images::update_image)
                .patch(images::patch_image)
                .delete(images::delete_image),
        )
        .route(
            "/images/{id}/delete-with-layers/",
            delete(images::delete_with_layers),
        )
}

/// Create layer routes
fn layer_routes() -> Router<EditorState> {
    Router::new()
        .route("/layers/", get(layers::list_layers).post(layers::create_layer))
        .route(
            "/layers/{id}/",
            get(layers::get_layer)
                .put(layers::update_layer)
                .patch(layers::patch_layer)
                .delete(layers::delete_layer),
        )
}

/// Create all Editor domain API routes
pub fn routes() -> Router<EditorState> {
    Router::new()
        .merge(project_routes())
        .merge(image_routes())
        .merge(layer_routes())
}
