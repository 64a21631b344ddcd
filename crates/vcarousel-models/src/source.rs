//! Media source classification.
//!
//! Decides how a carousel item is played: through the share platform's
//! embedded player, through a streaming platform iframe, or directly as a
//! native media file. Pure functions of the URL string.

use serde::{Deserialize, Serialize};

use url::Url;

use crate::utils::{
    host_matches, is_youtube_host, mentions_share_platform, mentions_streaming_platform,
    parse_web_url, share_platform_id,
};

/// Playback strategy for a media reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaSource {
    /// Video-sharing platform played through its player SDK.
    /// An empty `video_id` means the URL shape was not recognized.
    SharePlatform { video_id: String },
    /// Streaming platform played through an iframe embed
    StreamingEmbed { embed_url: String },
    /// Directly playable file reference
    Native { url: String },
}

/// Discriminant of [`MediaSource`], for callers that only need the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    SharePlatform,
    StreamingEmbed,
    Native,
}

impl MediaSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            MediaSource::SharePlatform { .. } => SourceKind::SharePlatform,
            MediaSource::StreamingEmbed { .. } => SourceKind::StreamingEmbed,
            MediaSource::Native { .. } => SourceKind::Native,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, MediaSource::Native { .. })
    }

    /// False for platform references that failed validation and for native
    /// references with a non-web scheme.
    pub fn is_playable(&self) -> bool {
        match self {
            MediaSource::SharePlatform { video_id } => !video_id.is_empty(),
            MediaSource::StreamingEmbed { embed_url } => !embed_url.is_empty(),
            MediaSource::Native { url } => is_native_reference(url),
        }
    }

    /// URL to place in an iframe, for the embed-based strategies.
    pub fn iframe_url(&self) -> Option<String> {
        match self {
            MediaSource::SharePlatform { video_id } if !video_id.is_empty() => {
                Some(format!("https://www.youtube.com/embed/{}", video_id))
            }
            MediaSource::StreamingEmbed { embed_url } if !embed_url.is_empty() => {
                Some(embed_url.clone())
            }
            _ => None,
        }
    }
}

/// Classify a media reference.
///
/// The platform strategies require an `http`/`https` URL whose host is the
/// platform or one of its subdomains. A reference that names a platform but
/// fails that check keeps the platform strategy with an empty target, so it
/// is reported as unplayable instead of being handed to a player.
pub fn classify(url: &str) -> MediaSource {
    let trimmed = url.trim();

    match parse_web_url(trimmed) {
        Some(web) if is_youtube_host(&web) => MediaSource::SharePlatform {
            video_id: share_platform_id(trimmed),
        },
        Some(web) if host_matches(&web, "vimeo.com") => MediaSource::StreamingEmbed {
            embed_url: streaming_embed_url(&web),
        },
        Some(_) => MediaSource::Native {
            url: trimmed.to_string(),
        },
        None if mentions_share_platform(trimmed) => MediaSource::SharePlatform {
            video_id: String::new(),
        },
        None if mentions_streaming_platform(trimmed) => MediaSource::StreamingEmbed {
            embed_url: String::new(),
        },
        None => MediaSource::Native {
            url: trimmed.to_string(),
        },
    }
}

/// Normalize a streaming-platform URL to its player embed form.
///
/// `https://vimeo.com/12345` becomes `https://player.vimeo.com/video/12345`;
/// URLs already on the player host, or without a numeric id, are kept as
/// parsed.
fn streaming_embed_url(url: &Url) -> String {
    if url.host_str() == Some("player.vimeo.com") {
        return url.to_string();
    }

    let numeric_id = url.path_segments().and_then(|mut segments| {
        segments.find(|segment| {
            !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit())
        })
    });

    match numeric_id {
        Some(id) => format!("https://player.vimeo.com/video/{}", id),
        None => url.to_string(),
    }
}

/// Whether a native reference can be handed to a media element: relative
/// paths and `http`/`https`/`blob` URLs only.
fn is_native_reference(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https" | "blob"),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_share_platform() {
        assert_eq!(
            classify("https://youtu.be/abc123"),
            MediaSource::SharePlatform {
                video_id: "abc123".to_string()
            }
        );
        assert_eq!(
            classify("https://youtube.com/watch?v=abc123&t=5"),
            MediaSource::SharePlatform {
                video_id: "abc123".to_string()
            }
        );
        assert_eq!(
            classify("https://www.youtube.com/embed/abc123").kind(),
            SourceKind::SharePlatform
        );
    }

    #[test]
    fn test_unrecognized_share_shape_is_unplayable() {
        let source = classify("https://www.youtube.com/playlist?list=PL123");
        assert_eq!(source.kind(), SourceKind::SharePlatform);
        assert!(!source.is_playable());
        assert_eq!(source.iframe_url(), None);
    }

    #[test]
    fn test_classify_streaming_embed() {
        assert_eq!(
            classify("https://vimeo.com/76979871"),
            MediaSource::StreamingEmbed {
                embed_url: "https://player.vimeo.com/video/76979871".to_string()
            }
        );
        assert_eq!(
            classify("https://player.vimeo.com/video/1?h=abc"),
            MediaSource::StreamingEmbed {
                embed_url: "https://player.vimeo.com/video/1?h=abc".to_string()
            }
        );
    }

    #[test]
    fn test_classify_native() {
        let source = classify("https://cdn.example.com/a.mp4");
        assert_eq!(
            source,
            MediaSource::Native {
                url: "https://cdn.example.com/a.mp4".to_string()
            }
        );
        assert!(source.is_native());
        assert!(source.is_playable());
        assert!(!classify("   ").is_playable());
    }

    #[test]
    fn test_script_urls_never_reach_an_iframe() {
        for raw in [
            "javascript:alert(document.domain)//vimeo.com",
            "data:text/html,<script>alert(1)</script>//vimeo.com",
            "javascript:alert(1)//youtube.com/watch?v=dQw4w9WgXcQ",
        ] {
            let source = classify(raw);
            assert_ne!(source.kind(), SourceKind::Native, "{raw}");
            assert!(!source.is_playable(), "{raw}");
            assert_eq!(source.iframe_url(), None, "{raw}");
        }
    }

    #[test]
    fn test_lookalike_hosts_are_native() {
        let source = classify("https://vimeo.com.evil.example/12345");
        assert_eq!(source.kind(), SourceKind::Native);

        let source = classify("https://cdn.example.com/youtube.com/clip.mp4");
        assert_eq!(source.kind(), SourceKind::Native);
    }

    #[test]
    fn test_native_rejects_script_schemes() {
        assert!(!classify("javascript:alert(1)").is_playable());
        assert!(classify("/videos/videos/a.mp4").is_playable());
        assert!(classify("clip.mp4").is_playable());
    }
}
