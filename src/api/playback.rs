//! Playback endpoints
//!
//! GET /cover-64x64 - current album cover as a 64x64 RGB565 grid
//! GET /id-playing  - current track id ("" when idle)
//! GET /me          - Spotify profile of the authorized user

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::{render_url, ApiError, AppState};
use crate::raster::{CropMode, PixelGrid};
use crate::spotify::Profile;

const NOTHING_PLAYING: &str = "No se está reproduciendo ninguna canción";
const NO_COVER: &str = "La canción actual no tiene portada";

/// Build playback router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cover-64x64", get(cover))
        .route("/id-playing", get(id_playing))
        .route("/me", get(me))
}

/// Album art of the playing track, already square so no crop
async fn cover(State(state): State<AppState>) -> Result<Json<PixelGrid>, ApiError> {
    let playing = state
        .spotify
        .currently_playing()
        .await?
        .ok_or_else(|| ApiError::not_found(NOTHING_PLAYING))?;

    let url = playing
        .cover_url
        .ok_or_else(|| ApiError::not_found(NO_COVER))?;

    let grid = render_url(&state, &url, CropMode::None).await?;
    Ok(Json(grid))
}

#[derive(Debug, Serialize)]
pub struct IdPlayingResponse {
    pub id: String,
}

async fn id_playing(State(state): State<AppState>) -> Result<Json<IdPlayingResponse>, ApiError> {
    let id = state
        .spotify
        .currently_playing()
        .await?
        .map(|playing| playing.track_id)
        .unwrap_or_default();

    Ok(Json(IdPlayingResponse { id }))
}

async fn me(State(state): State<AppState>) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.spotify.profile().await?))
}
