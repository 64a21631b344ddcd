//! In-memory [`VideoStore`] for local development and tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::range::{content_range, ByteRange};
use crate::store::{object_url, ObjectData, ObjectInfo, VideoStore};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
    last_modified: DateTime<Utc>,
}

/// Bucket kept in process memory. Keys are listed in lexical order, like
/// the S3 API.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    public_base_url: Option<String>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into());
        self
    }

    /// Store an object with an explicit modification time.
    pub async fn insert_at(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        last_modified: DateTime<Utc>,
    ) {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                last_modified,
            },
        );
    }

    /// Make connectivity checks fail, as if the bucket were unreachable.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        debug!("Storing {} bytes at {}", data.len(), key);
        self.insert_at(key, data, content_type, Utc::now()).await;
        Ok(())
    }

    async fn get_object(&self, key: &str, range: Option<&str>) -> StorageResult<ObjectData> {
        let objects = self.objects.read().await;
        let object = objects.get(key).ok_or_else(|| StorageError::not_found(key))?;
        let size = object.data.len() as u64;

        let Some(range) = range.and_then(ByteRange::parse) else {
            return Ok(ObjectData {
                bytes: object.data.clone(),
                content_type: object.content_type.clone(),
                content_range: None,
                total_size: Some(size),
            });
        };

        let (first, last) = range
            .resolve(size)
            .ok_or_else(|| StorageError::RangeNotSatisfiable(key.to_string()))?;

        Ok(ObjectData {
            bytes: object.data[first as usize..=last as usize].to_vec(),
            content_type: object.content_type.clone(),
            content_range: Some(content_range(first, last, size)),
            total_size: Some(size),
        })
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        // Like S3, deleting a missing key succeeds.
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectInfo {
                key: key.clone(),
                size: object.data.len() as u64,
                last_modified: Some(object.last_modified),
            })
            .collect())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory store marked unavailable".to_string()));
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        object_url(self.public_base_url.as_deref(), key)
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[tokio::test]
    async fn test_range_reads() {
        let store = MemoryStore::new();
        store
            .put_object("videos/a.mp4", (0u8..100).collect(), "video/mp4")
            .await
            .unwrap();

        let data = store.get_object("videos/a.mp4", Some("bytes=10-19")).await.unwrap();
        assert_eq!(data.bytes, (10u8..20).collect::<Vec<_>>());
        assert_eq!(data.content_range.as_deref(), Some("bytes 10-19/100"));

        let data = store.get_object("videos/a.mp4", Some("bytes=0-1,5-6")).await.unwrap();
        assert_eq!(data.bytes.len(), 100);
        assert!(!data.is_partial());

        assert!(matches!(
            store.get_object("videos/a.mp4", Some("bytes=100-")).await,
            Err(StorageError::RangeNotSatisfiable(_))
        ));
        assert!(matches!(
            store.get_object("videos/missing.mp4", None).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_is_prefix_scoped() {
        let store = MemoryStore::new();
        for key in ["thumbnails/a.jpg", "videos/a.mp4", "videos/b.mp4", "videosx/c.mp4"] {
            store.put_object(key, vec![1], "application/octet-stream").await.unwrap();
        }

        let keys: Vec<_> = store
            .list_objects("videos/")
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.key)
            .collect();
        assert_eq!(keys, vec!["videos/a.mp4", "videos/b.mp4"]);
    }

    #[tokio::test]
    async fn test_connectivity_toggle() {
        let store = MemoryStore::new();
        assert_ok!(store.check_connectivity().await);
        store.set_available(false);
        assert_err!(store.check_connectivity().await);
    }
}
