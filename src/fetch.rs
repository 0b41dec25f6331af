//! Image download by URL

use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Image download errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),
}

/// Downloads source images for the raster pipeline
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
}

impl ImageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Download the raw bytes behind `url`
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!("Downloading image from: {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let data = response.bytes().await?;
        debug!("Downloaded {} bytes from {}", data.len(), url);
        Ok(data.to_vec())
    }
}
