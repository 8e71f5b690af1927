//! Easel application composition root
//!
//! Wires the editor routes to PostgreSQL and media storage and wraps them in
//! the shared HTTP middleware.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use easel_common::config::Config;
use easel_editor::{EditorRepositories, EditorState};
use easel_media::{MediaConfig, MediaStorage, MediaStorageFactory};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// HTTP settings applied around the domain routes
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Comma separated list of allowed origins, or `*`
    pub cors_allowed_origins: String,
    pub max_upload_bytes: usize,
}

impl From<&Config> for HttpSettings {
    fn from(config: &Config) -> Self {
        Self {
            cors_allowed_origins: config.cors_allowed_origins.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Apply pending migrations from `migrations/`
pub async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Create the main application router with all routes and middleware
pub async fn create_app(config: &Config, pool: PgPool) -> Result<Router, anyhow::Error> {
    if config.run_migrations {
        run_migrations(&pool).await?;
    }

    // Create media storage from environment
    let media_config = MediaConfig::from_env()?;
    let media: Arc<dyn MediaStorage> = Arc::from(MediaStorageFactory::create(media_config).await?);

    let state = EditorState::new(EditorRepositories::postgres(pool), media);
    Ok(router(state, &HttpSettings::from(config)))
}

/// Build the router for an editor state.
///
/// Uploaded files are served under the path of the media URL when the
/// storage keeps them on local disk.
pub fn router(state: EditorState, settings: &HttpSettings) -> Router {
    let media_prefix = easel_media::url_path(state.media.base_url()).to_string();
    let media_root = state.media.local_root().map(|p| p.to_path_buf());

    let mut app = Router::new()
        .route("/health", get(health_check))
        .merge(easel_editor::routes().with_state(state));

    if let Some(root) = media_root {
        if media_prefix.starts_with('/') && media_prefix.len() > 1 {
            tracing::info!(prefix = %media_prefix, root = %root.display(), "Serving media files");
            app = app.nest_service(&media_prefix, ServeDir::new(root));
        }
    }

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(build_cors_layer(&settings.cors_allowed_origins))
            .layer(DefaultBodyLimit::max(settings.max_upload_bytes))
            .into_inner(),
    )
}

/// CORS for the browser client: `*` allows any origin, otherwise only the
/// listed ones
pub fn build_cors_layer(origins: &str) -> CorsLayer {
    let origins = origins.trim();
    if origins == "*" {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

/// Health check endpoint
#[mutants::skip] // Static liveness response
async fn health_check() -> &'static str {
    "OK"
}
