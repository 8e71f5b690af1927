//! HTTP API for the Editor domain

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use middleware::EditorState;
pub use routes::routes;
