//! Snippet rendering handler.

use axum::extract::State;
use axum::response::Html;
use axum::Json;
use serde::Deserialize;
use vcarousel_models::{classify, extract_youtube_id, ListVideosResponse, SourceKind};
use vcarousel_player::{SnippetEmitter, SnippetItem, SnippetOptions};
use vcarousel_storage as storage;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SnippetRequest {
    /// Slides to render; the bucket listing is used when empty
    pub items: Vec<SnippetItem>,
    pub options: SnippetOptions,
}

/// Render an embeddable carousel.
///
/// POST /snippet
pub async fn render_snippet(
    State(state): State<AppState>,
    Json(request): Json<SnippetRequest>,
) -> ApiResult<Html<String>> {
    let items = if request.items.is_empty() {
        let videos = storage::list_videos(state.storage.as_ref()).await?;
        ListVideosResponse { videos }
            .into_media_items()
            .into_iter()
            .map(SnippetItem::from)
            .collect()
    } else {
        for item in &request.items {
            validate_item(item)?;
        }
        request.items
    };

    if items.is_empty() {
        return Err(ApiError::bad_request("No videos to render"));
    }

    Ok(Html(SnippetEmitter::render(&items, &request.options)))
}

/// Reject caller-supplied slides that would be dropped from the snippet.
fn validate_item(item: &SnippetItem) -> ApiResult<()> {
    let source = classify(&item.url);
    if source.kind() == SourceKind::SharePlatform {
        extract_youtube_id(&item.url)
            .map_err(|e| ApiError::bad_request(format!("{}: {}", item.url, e)))?;
    } else if !source.is_playable() {
        return Err(ApiError::bad_request(format!(
            "{}: not a supported media URL",
            item.url
        )));
    }
    Ok(())
}
