//! Utility functions for URL parsing and object keys.
//!
//! Shared by the resolver, the storage layer and the snippet emitter.

use thiserror::Error;
use url::Url;

/// Errors that can occur during strict YouTube ID extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum YoutubeIdError {
    /// URL is not a YouTube URL
    #[error("URL is not a valid YouTube URL")]
    InvalidYoutubeUrl,
    /// Video ID has invalid format
    #[error("Video ID has invalid format")]
    InvalidVideoId,
    /// Video ID not found in URL
    #[error("Video ID not found in URL")]
    VideoIdNotFound,
}

/// Result type for YouTube ID extraction.
pub type YoutubeIdResult<T> = Result<T, YoutubeIdError>;

const SHARE_PLATFORM_HOSTS: [&str; 3] = ["youtube.com", "youtu.be", "youtube-nocookie.com"];
const STREAMING_HOST: &str = "vimeo.com";

/// Parse an absolute `http`/`https` reference.
///
/// Scheme-less references such as `youtube.com/watch?v=x` are read as https.
/// Any other scheme (`javascript:`, `data:`, ...) yields `None`.
pub fn parse_web_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    let parsed = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) if !raw.starts_with('/') => {
            Url::parse(&format!("https://{}", raw)).ok()?
        }
        Err(_) => return None,
    };

    matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}

/// True when the host is `domain` or one of its subdomains.
pub fn host_matches(url: &Url, domain: &str) -> bool {
    url.host_str().is_some_and(|host| {
        host == domain
            || host
                .strip_suffix(domain)
                .is_some_and(|rest| rest.ends_with('.'))
    })
}

/// Check if URL is served from a YouTube host.
pub fn is_youtube_domain(url: &str) -> bool {
    parse_web_url(url).is_some_and(|u| is_youtube_host(&u))
}

/// Check if URL is served from the Vimeo streaming platform.
pub fn is_vimeo_domain(url: &str) -> bool {
    parse_web_url(url).is_some_and(|u| host_matches(&u, STREAMING_HOST))
}

pub(crate) fn is_youtube_host(url: &Url) -> bool {
    SHARE_PLATFORM_HOSTS.iter().any(|domain| host_matches(url, domain))
}

/// True when the raw string names a share or streaming platform, whether or
/// not it is a well-formed web URL.
pub(crate) fn mentions_share_platform(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    lower.contains("youtube.com") || lower.contains("youtu.be")
}

pub(crate) fn mentions_streaming_platform(raw: &str) -> bool {
    raw.to_ascii_lowercase().contains(STREAMING_HOST)
}

/// Lenient share-platform id extraction used for playback.
///
/// Recognizes the watch (`?v=`), short-link (`youtu.be/<id>`) and embed
/// (`/embed/<id>`) shapes. Anything else, including ids with characters
/// outside `[A-Za-z0-9_-]`, yields an empty string, which callers must treat
/// as an unplayable source. No length validation is done.
pub fn share_platform_id(url: &str) -> String {
    parse_web_url(url)
        .filter(is_youtube_host)
        .and_then(|u| id_candidate(&u, false))
        .filter(|id| !id.is_empty() && has_id_chars(id))
        .unwrap_or_default()
}

/// Strict extraction returning a validated 11-character id.
///
/// Accepts the same shapes as [`share_platform_id`] plus `/shorts/<id>`.
pub fn extract_youtube_id(url: &str) -> YoutubeIdResult<String> {
    let parsed = parse_web_url(url)
        .filter(is_youtube_host)
        .ok_or(YoutubeIdError::InvalidYoutubeUrl)?;

    let id = id_candidate(&parsed, true).ok_or(YoutubeIdError::VideoIdNotFound)?;
    if id.len() != 11 || !has_id_chars(&id) {
        return Err(YoutubeIdError::InvalidVideoId);
    }
    Ok(id)
}

fn id_candidate(url: &Url, allow_shorts: bool) -> Option<String> {
    if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
        return Some(v.trim().to_string());
    }

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    if host_matches(url, "youtu.be") {
        return segments.next().map(str::to_string);
    }

    match segments.next()? {
        "embed" => segments.next().map(str::to_string),
        "shorts" if allow_shorts => segments.next().map(str::to_string),
        _ => None,
    }
}

fn has_id_chars(id: &str) -> bool {
    id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Last path segment of an object key (`videos/clip.mp4` -> `clip.mp4`).
pub fn file_name_from_key(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// File name without its final extension (`videos/clip.v2.mp4` -> `clip.v2`).
pub fn file_stem(key: &str) -> &str {
    let name = file_name_from_key(key);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(pos) => &name[..pos],
    }
}

/// Format bytes as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
