//! High-level video operations over a [`VideoStore`].
//!
//! Videos live under `videos/`, thumbnails under `thumbnails/` named after
//! the video's file stem (`videos/clip.mp4` pairs with `thumbnails/clip.jpg`).

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vcarousel_models::{file_name_from_key, file_stem, format_bytes, VideoObject};

use crate::error::{StorageError, StorageResult};
use crate::store::VideoStore;

pub const VIDEOS_PREFIX: &str = "videos/";
pub const THUMBNAILS_PREFIX: &str = "thumbnails/";

/// A stored thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailObject {
    pub key: String,
    pub url: String,
    pub video_key: String,
}

/// Reject keys that could escape the bucket layout.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.trim().is_empty() {
        return Err(StorageError::invalid_key("key is empty"));
    }
    if key.starts_with('/') {
        return Err(StorageError::invalid_key(format!("{} is an absolute path", key)));
    }
    if key.contains('\\') {
        return Err(StorageError::invalid_key(format!("{} contains a backslash", key)));
    }
    if key.split('/').any(|segment| segment == ".." || segment == ".") || key.contains("..") {
        return Err(StorageError::invalid_key(format!("{} contains a relative segment", key)));
    }
    if key.chars().any(char::is_control) {
        return Err(StorageError::invalid_key("key contains control characters"));
    }
    Ok(())
}

/// Reduce an uploaded file name to a safe single path segment.
pub fn sanitize_file_name(name: &str) -> StorageResult<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_' || c == '.') {
        return Err(StorageError::invalid_key(format!("unusable file name: {:?}", name)));
    }
    Ok(cleaned)
}

/// Content type for an upload: the declared one when present, otherwise
/// guessed from the file extension.
pub fn resolve_content_type(declared: Option<&str>, file_name: &str) -> String {
    match declared.map(str::trim).filter(|ct| !ct.is_empty()) {
        Some(ct) if ct != "application/octet-stream" => ct.to_ascii_lowercase(),
        _ => guess_content_type(file_name).to_string(),
    }
}

fn guess_content_type(file_name: &str) -> &'static str {
    let ext = file_name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "ogv" => "video/ogg",
        "mkv" => "video/x-matroska",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

fn image_extension(content_type: &str, file_name: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/jpeg" | "image/jpg" => "jpg",
        _ => match guess_content_type(file_name) {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "jpg",
        },
    }
}

/// List every video, paired with its thumbnail, newest first.
pub async fn list_videos(store: &dyn VideoStore) -> StorageResult<Vec<VideoObject>> {
    let videos = store.list_objects(VIDEOS_PREFIX).await?;
    let thumbnails = store.list_objects(THUMBNAILS_PREFIX).await?;

    let thumbnail_by_stem: HashMap<&str, &str> = thumbnails
        .iter()
        .map(|t| (file_stem(&t.key), t.key.as_str()))
        .collect();

    let mut listed: Vec<VideoObject> = videos
        .iter()
        .filter(|obj| !obj.key.ends_with('/'))
        .map(|obj| VideoObject {
            key: obj.key.clone(),
            url: store.public_url(&obj.key),
            size: obj.size,
            last_modified: obj.last_modified.unwrap_or_default(),
            thumbnail: thumbnail_by_stem
                .get(file_stem(&obj.key))
                .map(|thumb_key| store.public_url(thumb_key)),
        })
        .collect();

    listed.sort_by(|a, b| {
        b.last_modified
            .cmp(&a.last_modified)
            .then_with(|| a.key.cmp(&b.key))
    });
    Ok(listed)
}

/// Store an uploaded video under `videos/<sanitized name>`.
///
/// Thumbnails pair by file stem, so a video whose stem is already used by a
/// different video key is rejected. Re-uploading the same key overwrites it.
pub async fn upload_video(
    store: &dyn VideoStore,
    file_name: &str,
    content_type: Option<&str>,
    data: Vec<u8>,
) -> StorageResult<VideoObject> {
    let name = sanitize_file_name(file_name)?;
    let content_type = resolve_content_type(content_type, &name);
    if !content_type.starts_with("video/") {
        return Err(StorageError::UnsupportedContentType(content_type));
    }

    let key = format!("{}{}", VIDEOS_PREFIX, name);
    validate_key(&key)?;
    if let Some(existing) = video_with_same_stem(store, &key).await? {
        return Err(StorageError::StemInUse { key, existing });
    }
    let size = data.len() as u64;

    store.put_object(&key, data, &content_type).await?;
    info!(key = %key, size = %format_bytes(size), content_type = %content_type, "Uploaded video");

    Ok(VideoObject {
        url: store.public_url(&key),
        key,
        size,
        last_modified: Utc::now(),
        thumbnail: None,
    })
}

/// Store a thumbnail for `video_key`, replacing any earlier one.
pub async fn upload_thumbnail(
    store: &dyn VideoStore,
    video_key: &str,
    file_name: &str,
    content_type: Option<&str>,
    data: Vec<u8>,
) -> StorageResult<ThumbnailObject> {
    validate_key(video_key)?;
    let content_type = resolve_content_type(content_type, file_name);
    if !content_type.starts_with("image/") {
        return Err(StorageError::UnsupportedContentType(content_type));
    }

    let stem = file_stem(video_key);
    let key = format!(
        "{}{}.{}",
        THUMBNAILS_PREFIX,
        stem,
        image_extension(&content_type, file_name)
    );
    validate_key(&key)?;

    for old in thumbnail_keys(store, video_key).await? {
        if old != key {
            store.delete_object(&old).await?;
        }
    }

    store.put_object(&key, data, &content_type).await?;
    info!(key = %key, video_key = %video_key, "Uploaded thumbnail");

    Ok(ThumbnailObject {
        url: store.public_url(&key),
        key,
        video_key: video_key.to_string(),
    })
}

/// Delete a video and its thumbnail.
pub async fn delete_video(store: &dyn VideoStore, key: &str) -> StorageResult<()> {
    validate_key(key)?;
    if !store.exists(key).await? {
        return Err(StorageError::not_found(key));
    }

    store.delete_object(key).await?;

    for thumb in thumbnail_keys(store, key).await? {
        if let Err(e) = store.delete_object(&thumb).await {
            warn!(key = %thumb, error = %e, "Failed to delete thumbnail");
        }
    }

    info!(key = %key, name = %file_name_from_key(key), "Deleted video");
    Ok(())
}

async fn video_with_same_stem(store: &dyn VideoStore, key: &str) -> StorageResult<Option<String>> {
    let stem = file_stem(key);
    let prefix = format!("{}{}", VIDEOS_PREFIX, stem);
    Ok(store
        .list_objects(&prefix)
        .await?
        .into_iter()
        .map(|o| o.key)
        .find(|k| k != key && file_stem(k) == stem))
}

async fn thumbnail_keys(store: &dyn VideoStore, video_key: &str) -> StorageResult<Vec<String>> {
    let stem = file_stem(video_key);
    let prefix = format!("{}{}.", THUMBNAILS_PREFIX, stem);
    Ok(store
        .list_objects(&prefix)
        .await?
        .into_iter()
        .map(|o| o.key)
        .filter(|k| file_stem(k) == stem)
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use tokio_test::assert_ok;

    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn test_validate_key() {
        assert_ok!(validate_key("videos/clip.mp4"));
        assert!(validate_key("").is_err());
        assert!(validate_key("videos/../secret").is_err());
        assert!(validate_key("videos\\clip.mp4").is_err());
        assert!(validate_key("/etc/passwd").is_err());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("My Clip (1).mp4").unwrap(), "My_Clip__1_.mp4");
        assert_eq!(sanitize_file_name("../../evil.mp4").unwrap(), "evil.mp4");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\a.mov").unwrap(), "a.mov");
        assert!(sanitize_file_name("...").is_err());
        assert!(sanitize_file_name("").is_err());
    }

    #[test]
    fn test_resolve_content_type() {
        assert_eq!(resolve_content_type(Some("video/webm"), "a.mp4"), "video/webm");
        assert_eq!(resolve_content_type(None, "a.MOV"), "video/quicktime");
        assert_eq!(
            resolve_content_type(Some("application/octet-stream"), "a.mp4"),
            "video/mp4"
        );
    }

    #[tokio::test]
    async fn test_list_pairs_thumbnails_newest_first() {
        let store = MemoryStore::new().with_public_base_url("https://pub-1.r2.dev");
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        store.insert_at("videos/old.mp4", vec![0; 10], "video/mp4", t0).await;
        store
            .insert_at("videos/new.mp4", vec![0; 20], "video/mp4", t0 + Duration::hours(1))
            .await;
        store.insert_at("thumbnails/old.png", vec![1], "image/png", t0).await;

        let videos = list_videos(&store).await.unwrap();
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].key, "videos/new.mp4");
        assert_eq!(videos[0].thumbnail, None);
        assert_eq!(videos[1].key, "videos/old.mp4");
        assert_eq!(
            videos[1].thumbnail.as_deref(),
            Some("https://pub-1.r2.dev/thumbnails/old.png")
        );
        assert_eq!(videos[1].url, "https://pub-1.r2.dev/videos/old.mp4");
    }

    #[tokio::test]
    async fn test_upload_rejects_non_video() {
        let store = MemoryStore::new();
        let err = upload_video(&store, "notes.txt", Some("text/plain"), b"hi".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedContentType(_)));
        assert!(store.is_empty().await);

        let video = upload_video(&store, "clip one.mp4", None, vec![0; 8]).await.unwrap();
        assert_eq!(video.key, "videos/clip_one.mp4");
        assert_eq!(video.size, 8);
    }

    #[tokio::test]
    async fn test_thumbnail_replaces_previous_and_is_deleted_with_video() {
        let store = MemoryStore::new();
        upload_video(&store, "clip.mp4", Some("video/mp4"), vec![0; 4]).await.unwrap();

        upload_thumbnail(&store, "videos/clip.mp4", "a.jpg", Some("image/jpeg"), vec![1])
            .await
            .unwrap();
        let thumb = upload_thumbnail(&store, "videos/clip.mp4", "b.png", None, vec![2])
            .await
            .unwrap();
        assert_eq!(thumb.key, "thumbnails/clip.png");
        assert!(!store.exists("thumbnails/clip.jpg").await.unwrap());

        delete_video(&store, "videos/clip.mp4").await.unwrap();
        assert!(store.is_empty().await);

        assert!(matches!(
            delete_video(&store, "videos/clip.mp4").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_rejects_stem_shared_with_other_video() {
        let store = MemoryStore::new();
        upload_video(&store, "a.mp4", Some("video/mp4"), vec![0; 4])
            .await
            .unwrap();
        upload_thumbnail(&store, "videos/a.mp4", "a.jpg", Some("image/jpeg"), vec![1])
            .await
            .unwrap();

        let err = upload_video(&store, "a.webm", Some("video/webm"), vec![0; 4])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::StemInUse { ref existing, .. } if existing == "videos/a.mp4"));
        assert!(!store.exists("videos/a.webm").await.unwrap());

        // same key overwrites; a longer stem sharing the prefix is unrelated
        assert_ok!(upload_video(&store, "a.mp4", Some("video/mp4"), vec![0; 8]).await);
        assert_ok!(upload_video(&store, "ab.mp4", Some("video/mp4"), vec![0; 8]).await);

        delete_video(&store, "videos/ab.mp4").await.unwrap();
        assert!(store.exists("thumbnails/a.jpg").await.unwrap());
    }
}
