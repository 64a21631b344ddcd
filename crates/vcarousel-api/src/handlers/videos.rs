//! Video bucket handlers.

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use tracing::info;
use vcarousel_models::{ListVideosResponse, VideoObject};
use vcarousel_storage::{
    self as storage, validate_key, ThumbnailObject, THUMBNAILS_PREFIX, VIDEOS_PREFIX,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// A file part of a multipart upload.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Fields accepted by the upload endpoints.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub video_key: Option<String>,
}

impl UploadForm {
    /// Read every part, keeping `file` and `videoKey`. Unknown parts are
    /// drained and ignored.
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
        {
            match field.name() {
                Some("file") => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().map(str::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;
                    form.file = Some(UploadedFile {
                        file_name,
                        content_type,
                        data: data.to_vec(),
                    });
                }
                Some("videoKey") => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid videoKey: {}", e)))?;
                    form.video_key = Some(value.trim().to_string());
                }
                _ => {}
            }
        }

        Ok(form)
    }

    fn require_file(&mut self) -> ApiResult<UploadedFile> {
        let file = self
            .file
            .take()
            .ok_or_else(|| ApiError::bad_request("Missing multipart field \"file\""))?;
        if file.data.is_empty() {
            return Err(ApiError::bad_request("Uploaded file is empty"));
        }
        Ok(file)
    }
}

/// List videos.
///
/// GET /list-videos
pub async fn list_videos(State(state): State<AppState>) -> ApiResult<Json<ListVideosResponse>> {
    let videos = storage::list_videos(state.storage.as_ref()).await?;
    Ok(Json(ListVideosResponse { videos }))
}

/// Upload a video.
///
/// POST /upload
pub async fn upload_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<VideoObject>)> {
    let file = UploadForm::read(multipart).await?.require_file()?;

    let video = storage::upload_video(
        state.storage.as_ref(),
        &file.file_name,
        file.content_type.as_deref(),
        file.data,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(video)))
}

/// Upload a thumbnail for an existing video.
///
/// POST /upload-thumbnail
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ThumbnailObject>)> {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.require_file()?;
    let video_key = form
        .video_key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing multipart field \"videoKey\""))?;

    validate_key(&video_key)?;
    if !video_key.starts_with(VIDEOS_PREFIX) {
        return Err(ApiError::bad_request("videoKey must name a video"));
    }
    if !state.storage.exists(&video_key).await? {
        return Err(ApiError::not_found(format!("Video {} not found", video_key)));
    }

    let thumbnail = storage::upload_thumbnail(
        state.storage.as_ref(),
        &video_key,
        &file.file_name,
        file.content_type.as_deref(),
        file.data,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(thumbnail)))
}

/// Stream a stored object, honouring a single byte range.
///
/// GET /videos/*key
pub async fn get_video(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let key = key.trim_start_matches('/');
    validate_key(key)?;
    if !key.starts_with(VIDEOS_PREFIX) && !key.starts_with(THUMBNAILS_PREFIX) {
        return Err(ApiError::not_found(format!("Object {} not found", key)));
    }

    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let object = state.storage.get_object(key, range).await?;

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, &object.content_type)
        .header(header::CONTENT_LENGTH, object.bytes.len())
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .header("Cross-Origin-Resource-Policy", "cross-origin");

    builder = match &object.content_range {
        Some(content_range) => builder
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_RANGE, content_range),
        None => builder.status(StatusCode::OK),
    };

    builder
        .body(Body::from(object.bytes))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}

/// Delete a video and its thumbnail.
///
/// DELETE /videos/*key
pub async fn delete_video(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<StatusCode> {
    let key = key.trim_start_matches('/');
    validate_key(key)?;
    if !key.starts_with(VIDEOS_PREFIX) {
        return Err(ApiError::bad_request("Only videos can be deleted"));
    }

    storage::delete_video(state.storage.as_ref(), key).await?;
    info!(key = %key, "Video deleted via API");
    Ok(StatusCode::NO_CONTENT)
}
