//! Carousel player configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Player configuration shared by every item of a carousel.
///
/// One parameterized configuration replaces separate player variants:
/// dimensions, autoplay/loop/muted defaults and control visibility are all
/// set here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Container id, also used to derive per-item mount element ids
    pub container_id: String,
    /// Player width in CSS pixels (None = fluid)
    pub width: Option<u32>,
    /// Player height in CSS pixels (None = aspect-ratio driven)
    pub height: Option<u32>,
    /// Start playback as soon as an item is mounted
    pub autoplay: bool,
    /// Restart an item when it ends
    pub loop_playback: bool,
    /// Initial mute state of newly activated items
    pub muted: bool,
    /// Initial volume (0-100) of newly activated items
    pub initial_volume: u8,
    /// Whether the controls overlay is shown at all
    pub show_controls: bool,
    /// Origin of the hosting page, used for cross-origin error diagnosis
    pub page_origin: Option<String>,
    /// Time a navigation animation needs to settle
    #[serde(with = "duration_ms")]
    pub settle_delay: Duration,
    /// Controls hide after this long without pointer activity
    #[serde(with = "duration_ms")]
    pub controls_idle_hide: Duration,
    /// Controls hide this long after the pointer leaves the player
    #[serde(with = "duration_ms")]
    pub controls_leave_hide: Duration,
    /// How many upcoming items are preloaded
    pub preload_ahead: usize,
    /// Bytes requested per preload
    pub preload_bytes: u64,
    /// A preload is abandoned (but counted as attempted) after this long
    #[serde(with = "duration_ms")]
    pub preload_timeout: Duration,
    /// Polling interval for the embedded player's current time
    #[serde(with = "duration_ms")]
    pub embed_poll_interval: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            container_id: "video-carousel".to_string(),
            width: None,
            height: None,
            autoplay: false,
            loop_playback: false,
            muted: false,
            initial_volume: 100,
            show_controls: true,
            page_origin: None,
            settle_delay: Duration::from_millis(300),
            controls_idle_hide: Duration::from_secs(3),
            controls_leave_hide: Duration::from_secs(1),
            preload_ahead: 2,
            preload_bytes: 512 * 1024,
            preload_timeout: Duration::from_secs(5),
            embed_poll_interval: Duration::from_millis(500),
        }
    }
}

impl PlayerConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            container_id: std::env::var("PLAYER_CONTAINER_ID").unwrap_or(defaults.container_id),
            width: env_parse("PLAYER_WIDTH"),
            height: env_parse("PLAYER_HEIGHT"),
            autoplay: env_bool("PLAYER_AUTOPLAY").unwrap_or(defaults.autoplay),
            loop_playback: env_bool("PLAYER_LOOP").unwrap_or(defaults.loop_playback),
            muted: env_bool("PLAYER_MUTED").unwrap_or(defaults.muted),
            initial_volume: env_parse::<u8>("PLAYER_VOLUME")
                .map(|v| v.min(100))
                .unwrap_or(defaults.initial_volume),
            show_controls: env_bool("PLAYER_SHOW_CONTROLS").unwrap_or(defaults.show_controls),
            page_origin: std::env::var("PLAYER_PAGE_ORIGIN").ok(),
            settle_delay: env_parse("PLAYER_SETTLE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle_delay),
            controls_idle_hide: env_parse("PLAYER_CONTROLS_IDLE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.controls_idle_hide),
            controls_leave_hide: env_parse("PLAYER_CONTROLS_LEAVE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.controls_leave_hide),
            preload_ahead: env_parse("PLAYER_PRELOAD_AHEAD").unwrap_or(defaults.preload_ahead),
            preload_bytes: env_parse("PLAYER_PRELOAD_BYTES").unwrap_or(defaults.preload_bytes),
            preload_timeout: env_parse("PLAYER_PRELOAD_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.preload_timeout),
            embed_poll_interval: env_parse("PLAYER_EMBED_POLL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.embed_poll_interval),
        }
    }

    /// Element id of the mount point for the item at `index`.
    pub fn mount_element_id(&self, index: usize) -> String {
        format!("{}-player-{}", self.container_id, index)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
