//! Carousel items, listing wire types and playback enums.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::file_name_from_key;

/// One entry of the carousel. Immutable once added to a carousel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Playable reference (native file URL or share/streaming platform URL)
    pub url: String,

    /// Name shown in the UI
    pub display_name: String,

    /// Optional poster image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl MediaItem {
    /// Create an item, deriving the display name from the URL's last path segment.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let display_name = display_name_from_url(&url);
        Self {
            url,
            display_name,
            thumbnail_url: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Set the poster image.
    pub fn with_thumbnail(mut self, thumbnail_url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(thumbnail_url.into());
        self
    }
}

fn display_name_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let name = file_name_from_key(without_query.trim_end_matches('/'));
    if name.is_empty() {
        url.to_string()
    } else {
        name.to_string()
    }
}

/// A stored video as returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoObject {
    /// Object key in the bucket
    pub key: String,

    /// Public playback URL
    pub url: String,

    /// Size in bytes
    pub size: u64,

    /// Upload/modification timestamp
    pub last_modified: DateTime<Utc>,

    /// Public thumbnail URL, if one was uploaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl From<VideoObject> for MediaItem {
    fn from(object: VideoObject) -> Self {
        Self {
            display_name: file_name_from_key(&object.key).to_string(),
            url: object.url,
            thumbnail_url: object.thumbnail,
        }
    }
}

/// Body of `GET /list-videos`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ListVideosResponse {
    pub videos: Vec<VideoObject>,
}

impl ListVideosResponse {
    /// Convert the listing into carousel items, preserving order.
    pub fn into_media_items(self) -> Vec<MediaItem> {
        self.videos.into_iter().map(MediaItem::from).collect()
    }
}

/// Allowed playback speed multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum PlaybackRate {
    Half,
    ThreeQuarters,
    #[default]
    Normal,
    OneAndQuarter,
    OneAndHalf,
    Double,
}

/// Rejected playback rate value.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Unsupported playback rate: {0}")]
pub struct InvalidPlaybackRate(pub f64);

impl PlaybackRate {
    /// All rates in ascending order.
    pub const ALL: [PlaybackRate; 6] = [
        PlaybackRate::Half,
        PlaybackRate::ThreeQuarters,
        PlaybackRate::Normal,
        PlaybackRate::OneAndQuarter,
        PlaybackRate::OneAndHalf,
        PlaybackRate::Double,
    ];

    pub fn as_f64(self) -> f64 {
        match self {
            PlaybackRate::Half => 0.5,
            PlaybackRate::ThreeQuarters => 0.75,
            PlaybackRate::Normal => 1.0,
            PlaybackRate::OneAndQuarter => 1.25,
            PlaybackRate::OneAndHalf => 1.5,
            PlaybackRate::Double => 2.0,
        }
    }

    /// Map a rate reported by a player back onto the allowed set.
    ///
    /// Players report floats; anything within 0.01 of an allowed value matches.
    pub fn from_reported(value: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|rate| (rate.as_f64() - value).abs() < 0.01)
    }
}

impl TryFrom<f64> for PlaybackRate {
    type Error = InvalidPlaybackRate;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_reported(value).ok_or(InvalidPlaybackRate(value))
    }
}

impl From<PlaybackRate> for f64 {
    fn from(rate: PlaybackRate) -> Self {
        rate.as_f64()
    }
}

impl fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.as_f64())
    }
}

/// Direction of the slide animation for the last accepted navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SlideDirection {
    /// Moving to the next item (content slides out to the left)
    Left,
    /// Moving to the previous item
    Right,
    #[default]
    None,
}

impl SlideDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlideDirection::Left => "left",
            SlideDirection::Right => "right",
            SlideDirection::None => "none",
        }
    }
}

impl fmt::Display for SlideDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_item_display_name() {
        let item = MediaItem::new("https://cdn.example.com/videos/a.mp4?token=1");
        assert_eq!(item.display_name, "a.mp4");

        let item = MediaItem::new("https://youtu.be/abc123").with_name("Intro");
        assert_eq!(item.display_name, "Intro");
    }

    #[test]
    fn test_listing_wire_format() {
        let json = r#"{
            "videos": [
                {
                    "key": "videos/a.mp4",
                    "url": "https://pub-1.r2.dev/videos/a.mp4",
                    "size": 1024,
                    "lastModified": "2024-05-01T10:00:00Z",
                    "thumbnail": "https://pub-1.r2.dev/thumbnails/a.jpg"
                },
                {
                    "key": "videos/b.mp4",
                    "url": "https://pub-1.r2.dev/videos/b.mp4",
                    "size": 2048,
                    "lastModified": "2024-05-02T10:00:00Z"
                }
            ]
        }"#;

        let listing: ListVideosResponse = serde_json::from_str(json).unwrap();
        let items = listing.into_media_items();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].display_name, "a.mp4");
        assert_eq!(
            items[0].thumbnail_url.as_deref(),
            Some("https://pub-1.r2.dev/thumbnails/a.jpg")
        );
        assert!(items[1].thumbnail_url.is_none());
    }

    #[test]
    fn test_video_object_serializes_camel_case() {
        let object = VideoObject {
            key: "videos/a.mp4".to_string(),
            url: "https://example.com/a.mp4".to_string(),
            size: 1,
            last_modified: "2024-05-01T10:00:00Z".parse().unwrap(),
            thumbnail: None,
        };
        let json = serde_json::to_value(&object).unwrap();
        assert!(json.get("lastModified").is_some());
        assert!(json.get("thumbnail").is_none());
    }

    #[test]
    fn test_playback_rate_parsing() {
        assert_eq!(PlaybackRate::try_from(1.25), Ok(PlaybackRate::OneAndQuarter));
        assert_eq!(PlaybackRate::from_reported(0.7500001), Some(PlaybackRate::ThreeQuarters));
        assert!(PlaybackRate::try_from(3.0).is_err());

        let rate: PlaybackRate = serde_json::from_str("2.0").unwrap();
        assert_eq!(rate, PlaybackRate::Double);
        assert_eq!(serde_json::to_string(&PlaybackRate::Half).unwrap(), "0.5");
        assert_eq!(PlaybackRate::OneAndHalf.to_string(), "1.5x");
    }
}
