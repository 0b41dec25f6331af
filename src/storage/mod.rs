//! Object storage for submitted photos
//!
//! Provides:
//! - The `BlobStore` abstraction used by the API and the photo bot
//! - A Supabase Storage backend

mod supabase;

use async_trait::async_trait;
use thiserror::Error;

pub use supabase::SupabaseStorage;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("storage returned {0}")]
    Status(reqwest::StatusCode),
}

/// An object in the bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub name: String,
    pub size: Option<u64>,
    pub content_type: Option<String>,
    pub created_at: Option<String>,
}

/// A bucket of named binary objects with public URLs
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// All objects at the bucket root
    async fn list(&self) -> Result<Vec<StoredObject>, StorageError>;

    /// Look up a single object by exact name
    async fn find(&self, name: &str) -> Result<Option<StoredObject>, StorageError>;

    /// Public URL for an object (does not check existence)
    fn public_url(&self, name: &str) -> String;

    /// Create or replace an object
    async fn upload(
        &self,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;
}
