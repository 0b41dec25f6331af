//! API error type and its HTTP mapping
//!
//! Bodies are short Spanish messages in plain text. Server-side failures are
//! logged with their detail and answered with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::fetch::FetchError;
use crate::photos::RecordError;
use crate::raster::RasterError;
use crate::spotify::{AuthError, SpotifyError};
use crate::storage::StorageError;

pub const MSG_AUTH: &str = "Error de autenticación con Spotify";
pub const MSG_SPOTIFY: &str = "Error al consultar Spotify";
pub const MSG_IMAGE: &str = "Error al procesar la imagen";
pub const MSG_STORAGE: &str = "Error al acceder al almacenamiento";
pub const MSG_DATABASE: &str = "Error al consultar la base de datos";

/// Errors returned by handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Spotify request failed: {0}")]
    Spotify(SpotifyError),

    #[error("image fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("image conversion failed: {0}")]
    Raster(#[from] RasterError),

    #[error("conversion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("photo records failed: {0}")]
    Records(#[from] RecordError),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Status code and public message
    fn status_and_message(&self) -> (StatusCode, &str) {
        match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Auth(_) => (StatusCode::INTERNAL_SERVER_ERROR, MSG_AUTH),
            ApiError::Spotify(_) => (StatusCode::INTERNAL_SERVER_ERROR, MSG_SPOTIFY),
            ApiError::Fetch(_) | ApiError::Raster(_) | ApiError::Task(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_IMAGE)
            }
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, MSG_STORAGE),
            ApiError::Records(_) => (StatusCode::INTERNAL_SERVER_ERROR, MSG_DATABASE),
        }
    }
}

impl From<SpotifyError> for ApiError {
    fn from(e: SpotifyError) -> Self {
        match e {
            SpotifyError::Auth(auth) => ApiError::Auth(auth),
            other => ApiError::Spotify(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }
        (status, message.to_string()).into_response()
    }
}
