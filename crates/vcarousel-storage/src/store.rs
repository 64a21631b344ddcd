//! Object store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageResult;

/// Information about a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,
    /// Size in bytes
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Body and metadata of a fetched object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectData {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// `Content-Range` value when a byte range was served
    pub content_range: Option<String>,
    /// Size of the whole object, when known
    pub total_size: Option<u64>,
}

impl ObjectData {
    pub fn is_partial(&self) -> bool {
        self.content_range.is_some()
    }
}

/// A bucket of video and thumbnail objects.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Fetch an object, optionally restricted to an HTTP `Range` header
    /// value. Malformed or multi-part ranges are ignored and the whole
    /// object is returned.
    async fn get_object(&self, key: &str, range: Option<&str>) -> StorageResult<ObjectData>;

    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    /// All objects under `prefix`.
    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    async fn check_connectivity(&self) -> StorageResult<()>;

    /// URL a browser can load `key` from.
    fn public_url(&self, key: &str) -> String;
}

/// Percent-encode every segment of a key, keeping the separators.
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// URL of `key` under `base`, or the API's streaming route when no public
/// bucket URL is configured.
pub(crate) fn object_url(base: Option<&str>, key: &str) -> String {
    match base {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), encode_key(key)),
        None => format!("/videos/{}", encode_key(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url() {
        assert_eq!(
            object_url(Some("https://pub-1.r2.dev/"), "videos/my clip.mp4"),
            "https://pub-1.r2.dev/videos/my%20clip.mp4"
        );
        assert_eq!(object_url(None, "videos/a.mp4"), "/videos/videos/a.mp4");
    }
}
