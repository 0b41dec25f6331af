//! SQLite-backed photo records

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sqlx::SqlitePool;

use super::{NewPhoto, PhotoRecord, PhotoRecords, RecordError};

/// Photo metadata stored in the `photos` table
#[derive(Clone)]
pub struct SqlitePhotoStore {
    pool: SqlitePool,
}

impl SqlitePhotoStore {
    /// Create a new photo store with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PhotoRecords for SqlitePhotoStore {
    async fn insert(&self, photo: NewPhoto) -> Result<PhotoRecord, RecordError> {
        // Fixed-width UTC timestamps sort correctly as text
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let result = sqlx::query(
            "INSERT INTO photos (photo_url, username, title, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&photo.photo_url)
        .bind(&photo.username)
        .bind(&photo.title)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        Ok(PhotoRecord {
            id: result.last_insert_rowid(),
            photo_url: photo.photo_url,
            username: photo.username,
            title: photo.title,
            created_at,
        })
    }

    async fn recent(&self, limit: u32, offset: u32) -> Result<Vec<PhotoRecord>, RecordError> {
        let rows: Vec<PhotoRecord> = sqlx::query_as(
            r#"
            SELECT id, photo_url, username, title, created_at
            FROM photos
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_pool;

    fn photo(n: usize) -> NewPhoto {
        NewPhoto {
            photo_url: format!("https://example.com/{}.jpg", n),
            username: format!("user{}", n),
            title: format!("title {}", n),
        }
    }

    #[tokio::test]
    async fn test_insert_returns_record() {
        let store = SqlitePhotoStore::new(test_pool().await);

        let record = store.insert(photo(1)).await.unwrap();
        assert!(record.id > 0);
        assert_eq!(record.username, "user1");
        assert_eq!(record.photo_url, "https://example.com/1.jpg");
        assert!(record.created_at.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let store = SqlitePhotoStore::new(test_pool().await);
        for n in 0..7 {
            store.insert(photo(n)).await.unwrap();
        }

        let recent = store.recent(5, 0).await.unwrap();
        let titles: Vec<&str> = recent.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["title 6", "title 5", "title 4", "title 3", "title 2"]
        );
    }

    #[tokio::test]
    async fn test_recent_offset() {
        let store = SqlitePhotoStore::new(test_pool().await);
        for n in 0..3 {
            store.insert(photo(n)).await.unwrap();
        }

        let page = store.recent(5, 2).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "title 0");

        assert!(store.recent(5, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nth_recent() {
        let store = SqlitePhotoStore::new(test_pool().await);
        store.insert(photo(0)).await.unwrap();
        store.insert(photo(1)).await.unwrap();

        let newest = store.nth_recent(0, 5).await.unwrap().unwrap();
        assert_eq!(newest.title, "title 1");
        assert!(store.nth_recent(2, 5).await.unwrap().is_none());
        // Beyond the window even if rows exist
        assert!(store.nth_recent(5, 5).await.unwrap().is_none());
    }
}
