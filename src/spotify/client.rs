//! Spotify Web API queries - current playback and user profile

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::auth::{AuthError, TokenProvider};

/// Spotify API errors
#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Spotify API error: {0}")]
    Status(StatusCode),
}

/// The track currently playing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub track_id: String,
    /// Largest album image, when the item has one
    pub cover_url: Option<String>,
}

/// Public fields of the authorized user's profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentlyPlaying {
    item: Option<PlayingItem>,
}

#[derive(Debug, Deserialize)]
struct PlayingItem {
    id: Option<String>,
    album: Option<Album>,
}

#[derive(Debug, Deserialize)]
struct Album {
    #[serde(default)]
    images: Vec<AlbumImage>,
}

#[derive(Debug, Deserialize)]
struct AlbumImage {
    url: String,
}

impl CurrentlyPlaying {
    fn into_now_playing(self) -> Option<NowPlaying> {
        let item = self.item?;
        let cover_url = item
            .album
            .and_then(|album| album.images.into_iter().next())
            .map(|image| image.url);
        Some(NowPlaying {
            track_id: item.id.unwrap_or_default(),
            cover_url,
        })
    }
}

/// Spotify Web API client
#[derive(Clone)]
pub struct SpotifyClient {
    client: Client,
    /// API base URL, e.g. https://api.spotify.com
    api_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl SpotifyClient {
    pub fn new(client: Client, api_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            tokens,
        }
    }

    /// What the user is playing right now, if anything
    pub async fn currently_playing(&self) -> Result<Option<NowPlaying>, SpotifyError> {
        let response = self.get("/v1/me/player/currently-playing").await?;

        // 204 means no active device or nothing playing
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let playing: CurrentlyPlaying = Self::parse(response).await?;
        Ok(playing.into_now_playing())
    }

    /// The authorized user's profile
    pub async fn profile(&self) -> Result<Profile, SpotifyError> {
        let response = self.get("/v1/me").await?;
        Self::parse(response).await
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, SpotifyError> {
        let token = self.tokens.access_token().await?;
        debug!("Spotify API request: GET {}", path);

        let response = self
            .client
            .get(format!("{}{}", self.api_url, path))
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Spotify rejected the access token");
            self.tokens.invalidate().await;
            return Err(AuthError::Revoked.into());
        }

        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SpotifyError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Spotify API error: {} - {}", status, body);
            return Err(SpotifyError::Status(status));
        }
        Ok(response.json().await?)
    }
}
