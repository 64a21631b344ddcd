//! Playback failure taxonomy.
//!
//! Native media elements report numeric error codes (1 aborted, 2 network,
//! 3 decode, 4 source not supported); the embedded share-platform player
//! reports its own codes. Both are folded into [`MediaErrorKind`], and a
//! failure is flagged as cross-origin-suspected when the source lives on a
//! known public storage host or on a different origin than the page.

use serde::{Deserialize, Serialize};
use url::Url;

/// Public-URL patterns of object storage providers that commonly serve
/// videos without CORS headers.
const STORAGE_PUBLIC_PATTERNS: &[&str] = &[
    ".r2.dev",
    "r2.cloudflarestorage.com",
    ".s3.amazonaws.com",
    "storage.googleapis.com",
];

const CORS_HINT: &str = "This looks like a CORS problem: the storage bucket must allow \
cross-origin requests from this site. Add this page's origin to the bucket's CORS policy \
(Access-Control-Allow-Origin) and reload.";

/// Cause of a playback failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaErrorKind {
    LoadAborted,
    Network,
    Decode,
    SourceUnsupported,
    Unknown,
}

impl MediaErrorKind {
    /// Map a native media element error code.
    pub fn from_media_code(code: Option<u16>) -> Self {
        match code {
            Some(1) => MediaErrorKind::LoadAborted,
            Some(2) => MediaErrorKind::Network,
            Some(3) => MediaErrorKind::Decode,
            Some(4) => MediaErrorKind::SourceUnsupported,
            _ => MediaErrorKind::Unknown,
        }
    }

    /// Map an embedded share-platform player error code.
    pub fn from_embed_code(code: i32) -> Self {
        match code {
            2 | 100 | 101 | 150 => MediaErrorKind::SourceUnsupported,
            5 => MediaErrorKind::Decode,
            _ => MediaErrorKind::Unknown,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            MediaErrorKind::LoadAborted => "Video loading was aborted",
            MediaErrorKind::Network => "A network error prevented the video from loading",
            MediaErrorKind::Decode => {
                "The video could not be decoded (corrupt file or unsupported encoding)"
            }
            MediaErrorKind::SourceUnsupported => {
                "The video format is not supported or the source could not be loaded"
            }
            MediaErrorKind::Unknown => "An unknown playback error occurred",
        }
    }

    /// Kinds that a blocked cross-origin request can surface as.
    fn may_be_cors(&self) -> bool {
        matches!(
            self,
            MediaErrorKind::Network | MediaErrorKind::SourceUnsupported | MediaErrorKind::Unknown
        )
    }
}

/// A recorded playback failure of one carousel item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackFailure {
    pub kind: MediaErrorKind,
    /// Extra context (embed error code meaning, factory error, ...)
    pub detail: Option<String>,
    pub cross_origin_suspected: bool,
}

impl PlaybackFailure {
    pub fn new(kind: MediaErrorKind) -> Self {
        Self {
            kind,
            detail: None,
            cross_origin_suspected: false,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Failure reported by a native media element playing `url`.
    pub fn from_media_error(code: Option<u16>, url: &str, page_origin: Option<&str>) -> Self {
        let kind = MediaErrorKind::from_media_code(code);
        Self {
            kind,
            detail: None,
            cross_origin_suspected: kind.may_be_cors()
                && is_cross_origin_suspected(url, page_origin),
        }
    }

    /// Failure reported by the embedded share-platform player.
    pub fn from_embed_error(code: i32) -> Self {
        let detail = match code {
            2 => "The video id is invalid",
            5 => "The embedded player could not play this video",
            100 => "The video was removed or is private",
            101 | 150 => "The owner does not allow this video to be embedded",
            _ => "The embedded player reported an error",
        };
        Self::new(MediaErrorKind::from_embed_code(code)).with_detail(detail)
    }

    /// Human-readable message shown in place of the player.
    pub fn message(&self) -> String {
        let mut message = self.kind.message().to_string();
        if let Some(detail) = &self.detail {
            message.push_str(": ");
            message.push_str(detail);
        }
        if self.cross_origin_suspected {
            message.push_str(". ");
            message.push_str(CORS_HINT);
        }
        message
    }
}

/// Whether a failed load of `url` is plausibly a CORS rejection.
///
/// True when the host matches a known storage provider pattern, or when a
/// page origin is known and the URL is absolute with a different origin.
pub fn is_cross_origin_suspected(url: &str, page_origin: Option<&str>) -> bool {
    let lower = url.to_ascii_lowercase();
    if STORAGE_PUBLIC_PATTERNS.iter().any(|p| lower.contains(p)) {
        return true;
    }

    let (Some(page_origin), Ok(parsed)) = (page_origin, Url::parse(url)) else {
        return false;
    };

    let source_origin = parsed.origin().ascii_serialization();
    source_origin != page_origin.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_codes_map_to_distinct_messages() {
        let kinds: Vec<_> = [1, 2, 3, 4, 9]
            .into_iter()
            .map(|c| MediaErrorKind::from_media_code(Some(c)))
            .collect();
        assert_eq!(
            kinds,
            vec![
                MediaErrorKind::LoadAborted,
                MediaErrorKind::Network,
                MediaErrorKind::Decode,
                MediaErrorKind::SourceUnsupported,
                MediaErrorKind::Unknown,
            ]
        );

        let mut messages: Vec<_> = kinds.iter().map(|k| k.message()).collect();
        messages.dedup();
        assert_eq!(messages.len(), 5);
        assert_eq!(MediaErrorKind::from_media_code(None), MediaErrorKind::Unknown);
    }

    #[test]
    fn test_storage_pattern_gets_cors_hint() {
        let failure = PlaybackFailure::from_media_error(
            Some(4),
            "https://pub-abc123.r2.dev/videos/a.mp4",
            None,
        );
        assert_eq!(failure.kind, MediaErrorKind::SourceUnsupported);
        assert!(failure.cross_origin_suspected);
        assert!(failure.message().contains("CORS"));
    }

    #[test]
    fn test_decode_error_never_gets_cors_hint() {
        let failure = PlaybackFailure::from_media_error(
            Some(3),
            "https://pub-abc123.r2.dev/videos/a.mp4",
            None,
        );
        assert!(!failure.cross_origin_suspected);
        assert!(!failure.message().contains("CORS"));
    }

    #[test]
    fn test_origin_comparison() {
        assert!(is_cross_origin_suspected(
            "https://cdn.example.com/a.mp4",
            Some("https://app.example.com")
        ));
        assert!(!is_cross_origin_suspected(
            "https://app.example.com/a.mp4",
            Some("https://app.example.com/")
        ));
        assert!(!is_cross_origin_suspected("/videos/a.mp4", Some("https://app.example.com")));
        assert!(!is_cross_origin_suspected("https://cdn.example.com/a.mp4", None));
    }

    #[test]
    fn test_embed_codes() {
        let failure = PlaybackFailure::from_embed_error(150);
        assert_eq!(failure.kind, MediaErrorKind::SourceUnsupported);
        assert!(failure.message().contains("embedded"));
        assert_eq!(MediaErrorKind::from_embed_code(5), MediaErrorKind::Decode);
        assert_eq!(MediaErrorKind::from_embed_code(42), MediaErrorKind::Unknown);
    }
}
