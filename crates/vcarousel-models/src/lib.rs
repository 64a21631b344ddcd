//! Shared data models for the video carousel.
//!
//! This crate provides Serde-serializable types for:
//! - Carousel media items and the bucket listing wire format
//! - Playback rates and slide directions
//! - Media source classification (share platform, streaming embed, native file)
//! - Share-platform video id extraction

pub mod media;
pub mod source;
pub mod utils;

// Re-export common types
pub use media::{
    ListVideosResponse, MediaItem, PlaybackRate, SlideDirection, VideoObject,
};
pub use source::{classify, MediaSource, SourceKind};
pub use utils::{
    extract_youtube_id, file_name_from_key, file_stem, format_bytes, host_matches, is_vimeo_domain,
    is_youtube_domain, parse_web_url, share_platform_id, YoutubeIdError, YoutubeIdResult,
};
