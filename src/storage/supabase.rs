//! Supabase Storage REST backend

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{BlobStore, StorageError, StoredObject};

/// Listing page size; a shorter page is the last one
const LIST_LIMIT: u32 = 1000;

#[derive(Debug, Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: u32,
    offset: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    metadata: Option<EntryMetadata>,
}

#[derive(Debug, Deserialize)]
struct EntryMetadata {
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    mimetype: Option<String>,
}

impl From<ListEntry> for StoredObject {
    fn from(entry: ListEntry) -> Self {
        let (size, content_type) = match entry.metadata {
            Some(meta) => (meta.size, meta.mimetype),
            None => (None, None),
        };
        Self {
            name: entry.name,
            size,
            content_type,
            created_at: entry.created_at,
        }
    }
}

/// A single Supabase Storage bucket
#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    client: Client,
    /// Project URL, e.g. https://xyz.supabase.co
    base_url: String,
    api_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            bucket: bucket.into(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn list_page(
        &self,
        search: Option<&str>,
        offset: u32,
    ) -> Result<Vec<StoredObject>, StorageError> {
        let url = format!("{}/storage/v1/object/list/{}", self.base_url, self.bucket);
        let body = ListRequest {
            prefix: "",
            limit: LIST_LIMIT,
            offset,
            search,
        };

        let response = self
            .authorized(self.client.post(url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Storage list error: {} - {}", status, body);
            return Err(StorageError::Status(status));
        }

        let entries: Vec<ListEntry> = response.json().await?;
        Ok(entries.into_iter().map(StoredObject::from).collect())
    }
}

#[async_trait]
impl BlobStore for SupabaseStorage {
    async fn list(&self) -> Result<Vec<StoredObject>, StorageError> {
        let mut objects = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.list_page(None, offset).await?;
            let last = page.len() < LIST_LIMIT as usize;
            objects.extend(page);
            if last {
                return Ok(objects);
            }
            offset += LIST_LIMIT;
        }
    }

    async fn find(&self, name: &str) -> Result<Option<StoredObject>, StorageError> {
        // search is a substring match, so confirm the exact name
        let mut offset = 0;

        loop {
            let page = self.list_page(Some(name), offset).await?;
            let last = page.len() < LIST_LIMIT as usize;
            if let Some(object) = page.into_iter().find(|object| object.name == name) {
                return Ok(Some(object));
            }
            if last {
                return Ok(None);
            }
            offset += LIST_LIMIT;
        }
    }

    fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, name
        )
    }

    async fn upload(
        &self,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, name
        );
        let size = data.len();

        let response = self
            .authorized(self.client.post(url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(data)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Storage upload error: {} - {}", status, body);
            return Err(StorageError::Status(status));
        }

        debug!(
            "Uploaded {} ({} bytes) to bucket {}",
            name, size, self.bucket
        );
        Ok(())
    }
}
