//! Photo ingestion - upload submitted photos and record their metadata

use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use super::api::{Message, PhotoSize};
use crate::photos::{NewPhoto, PhotoRecord, PhotoRecords, RecordError};
use crate::storage::{BlobStore, StorageError};

/// Username recorded when the sender has none
const ANONYMOUS: &str = "anonimo";

/// Ingestion errors, each reported back to the submitting chat
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("upload failed: {0}")]
    Upload(#[from] StorageError),

    #[error("insert failed: {0}")]
    Insert(#[from] RecordError),
}

/// A photo message reduced to what ingestion needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoSubmission {
    pub chat_id: i64,
    pub file_id: String,
    pub username: String,
    pub title: String,
}

/// Extract a submission from a message carrying a photo
///
/// Telegram sends several sizes of the same photo; the largest is kept.
pub fn photo_submission(message: &Message) -> Option<PhotoSubmission> {
    let largest: &PhotoSize = message
        .photo
        .as_ref()?
        .iter()
        .max_by_key(|size| u64::from(size.width) * u64::from(size.height))?;

    let username = message
        .from
        .as_ref()
        .map(|user| {
            user.username
                .clone()
                .unwrap_or_else(|| user.first_name.clone())
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| ANONYMOUS.to_string());

    Some(PhotoSubmission {
        chat_id: message.chat.id,
        file_id: largest.file_id.clone(),
        username,
        title: message.caption.clone().unwrap_or_default(),
    })
}

/// Object name for photo content, addressed by its SHA-256 hash
pub fn object_name(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}.jpg", hasher.finalize())
}

/// Uploads photos and inserts their metadata rows
#[derive(Clone)]
pub struct PhotoIngestor {
    storage: Arc<dyn BlobStore>,
    records: Arc<dyn PhotoRecords>,
}

impl PhotoIngestor {
    pub fn new(storage: Arc<dyn BlobStore>, records: Arc<dyn PhotoRecords>) -> Self {
        Self { storage, records }
    }

    /// Store photo bytes and record who sent them
    pub async fn ingest(
        &self,
        data: Vec<u8>,
        username: &str,
        title: &str,
    ) -> Result<PhotoRecord, IngestError> {
        let name = object_name(&data);
        self.storage.upload(&name, data, "image/jpeg").await?;

        let record = self
            .records
            .insert(NewPhoto {
                photo_url: self.storage.public_url(&name),
                username: username.to_string(),
                title: title.to_string(),
            })
            .await?;

        info!("Ingested photo {} from {}", name, username);
        Ok(record)
    }
}
