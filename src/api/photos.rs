//! Stored photo endpoints
//!
//! GET /get-photo?id=N           - Nth most recent photo as a 64x64 grid
//! GET /get-photo-url?fileName=F - public URL of a bucket object

use std::sync::LazyLock;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{render_url, ApiError, AppState};
use crate::raster::{CropMode, PixelGrid};

/// Only the newest photos are addressable
pub const RECENT_PHOTOS: u32 = 5;

static INDEX_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+$").unwrap());

static FILE_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9._-]*$").unwrap());

const BAD_ID: &str = "El parámetro id debe ser un entero no negativo";
const NO_PHOTO: &str = "No existe una foto con ese id";
const MISSING_FILE_NAME: &str = "Falta el parámetro fileName";
const BAD_FILE_NAME: &str = "El nombre de archivo no es válido";
const NO_FILE: &str = "Archivo no encontrado";

/// Build photos router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/get-photo", get(get_photo))
        .route("/get-photo-url", get(get_photo_url))
}

/// Parse a photo index; None for anything but plain digits
pub fn parse_index(raw: &str) -> Option<u64> {
    if !INDEX_REGEX.is_match(raw) {
        return None;
    }
    // Digits that overflow are still valid, just out of range
    Some(raw.parse().unwrap_or(u64::MAX))
}

/// Validate a bucket object name
pub fn valid_file_name(name: &str) -> bool {
    FILE_NAME_REGEX.is_match(name)
}

#[derive(Debug, Deserialize)]
pub struct PhotoQuery {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PhotoResponse {
    pub photo: PixelGrid,
    pub title: String,
    pub username: String,
}

/// Render one of the most recent photos, center-cropped
async fn get_photo(
    State(state): State<AppState>,
    Query(query): Query<PhotoQuery>,
) -> Result<Json<PhotoResponse>, ApiError> {
    let index = query
        .id
        .as_deref()
        .and_then(parse_index)
        .ok_or_else(|| ApiError::validation(BAD_ID))?;

    let index = u32::try_from(index).unwrap_or(u32::MAX);
    let record = state
        .photos
        .nth_recent(index, RECENT_PHOTOS)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_PHOTO))?;

    let photo = render_url(&state, &record.photo_url, CropMode::CenterSquare).await?;

    Ok(Json(PhotoResponse {
        photo,
        title: record.title,
        username: record.username,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PhotoUrlQuery {
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PhotoUrlResponse {
    #[serde(rename = "publicURL")]
    pub public_url: String,
}

async fn get_photo_url(
    State(state): State<AppState>,
    Query(query): Query<PhotoUrlQuery>,
) -> Result<Json<PhotoUrlResponse>, ApiError> {
    let name = query
        .file_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::validation(MISSING_FILE_NAME))?;

    if !valid_file_name(&name) {
        return Err(ApiError::validation(BAD_FILE_NAME));
    }

    let object = state
        .storage
        .find(&name)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_FILE))?;

    Ok(Json(PhotoUrlResponse {
        public_url: state.storage.public_url(&object.name),
    }))
}
