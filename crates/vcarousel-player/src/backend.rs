//! Player backend contracts.
//!
//! The carousel never talks to a concrete player. A [`PlayerFactory`] is
//! injected per carousel instance and creates the player for whichever item
//! is active; the host forwards the player's events back to the carousel,
//! tagged with the [`MountId`] they were created for.

use serde::{Deserialize, Serialize};

use crate::config::PlayerConfig;
use crate::error::PlayerResult;

/// Identity of one mounted player.
///
/// The generation increases on every mount, so events from a player that
/// has since been detached can be recognized and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MountId {
    pub index: usize,
    pub generation: u64,
}

/// Where a player is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub id: MountId,
    /// Element id of the mount point inside the carousel container
    pub element_id: String,
}

/// Control surface of a native media element.
pub trait NativeMedia: Send {
    /// Start playback. May be rejected (e.g. autoplay policy).
    fn play(&mut self) -> PlayerResult<()>;
    fn pause(&mut self);
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    /// 0.0..=1.0
    fn volume(&self) -> f64;
    fn set_volume(&mut self, volume: f64);
    fn muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);
}

/// Events emitted by a native media element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaEvent {
    LoadedMetadata { duration: f64 },
    LoadedData,
    TimeUpdate { current_time: f64 },
    Play,
    Pause,
    Ended,
    /// `volume` in 0.0..=1.0
    VolumeChange { volume: f64, muted: bool },
    RateChange { rate: f64 },
    /// `code` is the element's `MediaError.code`, if any
    Error { code: Option<u16> },
}

/// Control surface of the embedded share-platform player.
pub trait EmbeddedPlayer: Send {
    fn play_video(&mut self);
    fn pause_video(&mut self);
    fn mute(&mut self);
    fn un_mute(&mut self);
    fn get_current_time(&self) -> f64;
    fn seek_to(&mut self, seconds: f64, allow_seek_ahead: bool);
    /// 0..=100
    fn set_volume(&mut self, volume: u8);
    fn set_playback_rate(&mut self, rate: f64);
    fn get_duration(&self) -> f64;
    fn destroy(&mut self);
}

/// Playback states reported by the embedded player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedPlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl EmbedPlayerState {
    /// Map the SDK's numeric state code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(EmbedPlayerState::Unstarted),
            0 => Some(EmbedPlayerState::Ended),
            1 => Some(EmbedPlayerState::Playing),
            2 => Some(EmbedPlayerState::Paused),
            3 => Some(EmbedPlayerState::Buffering),
            5 => Some(EmbedPlayerState::Cued),
            _ => None,
        }
    }
}

/// Callbacks of the embedded player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmbedEvent {
    Ready,
    StateChange { state: EmbedPlayerState },
    Error { code: i32 },
}

/// Creates players for a single carousel instance.
pub trait PlayerFactory: Send {
    /// Create a native media element for `url` at `mount`.
    fn create_native(
        &mut self,
        mount: &Mount,
        url: &str,
        config: &PlayerConfig,
    ) -> PlayerResult<Box<dyn NativeMedia>>;

    /// Create the embedded share-platform player for `video_id` at `mount`.
    fn create_embedded(
        &mut self,
        mount: &Mount,
        video_id: &str,
        config: &PlayerConfig,
    ) -> PlayerResult<Box<dyn EmbeddedPlayer>>;

    /// Place a streaming-platform iframe at `mount`. It has no control API.
    fn mount_iframe(&mut self, mount: &Mount, embed_url: &str, config: &PlayerConfig) -> PlayerResult<()> {
        let _ = (mount, embed_url, config);
        Ok(())
    }

    /// Remove whatever is mounted at `mount`.
    fn unmount(&mut self, mount: &Mount) {
        let _ = mount;
    }
}

/// The carousel container's fullscreen surface.
pub trait FullscreenTarget: Send {
    fn is_fullscreen(&self) -> bool;
    fn request_fullscreen(&mut self) -> PlayerResult<()>;
    fn exit_fullscreen(&mut self) -> PlayerResult<()>;
}
