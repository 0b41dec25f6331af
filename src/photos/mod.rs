//! Photo metadata records
//!
//! Rows are written by the photo bot and read back newest-first by the API.

mod store;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use store::SqlitePhotoStore;

/// Photo record errors
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A stored photo's metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct PhotoRecord {
    pub id: i64,
    pub photo_url: String,
    pub username: String,
    pub title: String,
    pub created_at: String,
}

/// Fields supplied when a photo is ingested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhoto {
    pub photo_url: String,
    pub username: String,
    pub title: String,
}

/// Store of photo metadata ordered by creation time
#[async_trait]
pub trait PhotoRecords: Send + Sync {
    async fn insert(&self, photo: NewPhoto) -> Result<PhotoRecord, RecordError>;

    /// Newest first, skipping `offset` rows
    async fn recent(&self, limit: u32, offset: u32) -> Result<Vec<PhotoRecord>, RecordError>;

    /// The `index`-th newest photo within the newest `window` photos
    async fn nth_recent(
        &self,
        index: u32,
        window: u32,
    ) -> Result<Option<PhotoRecord>, RecordError> {
        if index >= window {
            return Ok(None);
        }
        Ok(self.recent(1, index).await?.into_iter().next())
    }
}
