//! HTTP API module - playback relay, photo and login endpoints

mod auth;
mod error;
mod photos;
mod playback;

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

use crate::db::Database;
use crate::fetch::ImageFetcher;
use crate::photos::PhotoRecords;
use crate::raster::{CropMode, PixelGrid, RasterConverter};
use crate::spotify::{SpotifyAuth, SpotifyClient};
use crate::storage::BlobStore;
pub use error::ApiError;
pub use photos::RECENT_PHOTOS;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<SpotifyAuth>,
    pub spotify: SpotifyClient,
    pub photos: Arc<dyn PhotoRecords>,
    pub storage: Arc<dyn BlobStore>,
    pub fetcher: ImageFetcher,
    pub converter: RasterConverter,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
        .merge(auth::router())
        .merge(playback::router())
        .merge(photos::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Download an image and convert it off the async runtime
async fn render_url(state: &AppState, url: &str, crop: CropMode) -> Result<PixelGrid, ApiError> {
    let bytes = state.fetcher.fetch(url).await?;
    debug!("Converting {} bytes ({:?})", bytes.len(), crop);

    let converter = state.converter;
    let grid = tokio::task::spawn_blocking(move || converter.convert(&bytes, crop)).await??;
    Ok(grid)
}

/// Root endpoint
async fn root() -> impl IntoResponse {
    Json(RootResponse {
        name: "coverd",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let spotify = state.auth.status().as_str();

    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                database: "ok",
                spotify,
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy",
                database: "error",
                spotify,
            }),
        ),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    /// authorized, unauthorized or refreshing
    spotify: &'static str,
}
