//! Per-item playback state and carousel navigation state.
//!
//! Field ownership between optimistic writes and player events:
//!
//! | field | optimistic write | authoritative source |
//! |---|---|---|
//! | `is_playing` | play/pause commands | `play`/`pause`/`ended`, embed state change |
//! | `current_time` | seek/skip/reset | `timeupdate`, embed time poll |
//! | `volume`, `is_muted` | volume/mute commands | `volumechange` |
//! | `playback_rate` | rate command | `ratechange` |
//! | `duration` | never | `loadedmetadata`, embed ready/poll |
//! | `is_loading`, `has_error` | never | `loadeddata`, `error`, embed ready/error |
//!
//! The next event for a field always overwrites the optimistic value.

use serde::{Deserialize, Serialize};
use vcarousel_models::{PlaybackRate, SlideDirection};

use crate::config::PlayerConfig;
use crate::media_error::PlaybackFailure;

/// Volume restored when unmuting an item whose volume is 0.
const DEFAULT_RESTORE_VOLUME: u8 = 100;

/// Transient playback state of one carousel item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_loading: bool,
    pub has_error: bool,
    pub error_message: String,
    pub is_playing: bool,
    pub is_muted: bool,
    /// 0..=100
    pub volume: u8,
    /// Seconds, never above `duration` once duration is known
    pub current_time: f64,
    /// Seconds, 0 until metadata is loaded
    pub duration: f64,
    pub playback_rate: PlaybackRate,
    /// Last non-zero volume, restored when unmuting at volume 0
    #[serde(skip)]
    pub(crate) restore_volume: u8,
    #[serde(skip)]
    pub(crate) failure: Option<PlaybackFailure>,
}

impl PlaybackState {
    /// Initial state of an item that has just become active.
    pub fn new(config: &PlayerConfig) -> Self {
        let volume = config.initial_volume.min(100);
        Self {
            is_loading: true,
            has_error: false,
            error_message: String::new(),
            is_playing: false,
            is_muted: config.muted || volume == 0,
            volume,
            current_time: 0.0,
            duration: 0.0,
            playback_rate: PlaybackRate::Normal,
            restore_volume: if volume > 0 { volume } else { DEFAULT_RESTORE_VOLUME },
            failure: None,
        }
    }

    /// Recorded failure, if the item is in the error state.
    pub fn failure(&self) -> Option<&PlaybackFailure> {
        self.failure.as_ref()
    }

    /// `is_loading -> loaded`. Ignored once the item has failed.
    pub fn mark_loaded(&mut self) {
        if self.has_error {
            return;
        }
        self.is_loading = false;
    }

    /// `is_loading -> failed`. Terminal until [`PlaybackState::reset_for_reload`].
    pub fn mark_failed(&mut self, failure: PlaybackFailure) {
        self.is_loading = false;
        self.has_error = true;
        self.is_playing = false;
        self.error_message = failure.message();
        self.failure = Some(failure);
    }

    /// Back to the loading phase for a fresh source, keeping user preferences
    /// (volume, mute, rate).
    pub fn reset_for_reload(&mut self) {
        self.is_loading = true;
        self.has_error = false;
        self.error_message.clear();
        self.failure = None;
        self.is_playing = false;
        self.current_time = 0.0;
        self.duration = 0.0;
    }

    /// Record a duration reported by the player; non-finite values are ignored.
    pub fn set_duration(&mut self, duration: f64) {
        if !duration.is_finite() {
            return;
        }
        self.duration = duration.max(0.0);
        self.current_time = self.clamp_time(self.current_time);
    }

    /// Record a position, clamped to `[0, duration]` once duration is known.
    pub fn set_current_time(&mut self, time: f64) {
        if time.is_nan() {
            return;
        }
        self.current_time = self.clamp_time(time);
    }

    pub(crate) fn clamp_time(&self, time: f64) -> f64 {
        let time = time.max(0.0);
        if self.duration > 0.0 {
            time.min(self.duration)
        } else {
            time
        }
    }

    /// Apply a volume, coupling mute to zero volume.
    pub(crate) fn apply_volume(&mut self, volume: u8) {
        let volume = volume.min(100);
        self.volume = volume;
        if volume == 0 {
            self.is_muted = true;
        } else {
            self.is_muted = false;
            self.restore_volume = volume;
        }
    }

    /// Apply a mute flag. Unmuting at volume 0 restores the last audible volume.
    pub(crate) fn apply_muted(&mut self, muted: bool) {
        if muted {
            self.is_muted = true;
            return;
        }
        if self.volume == 0 {
            self.volume = self.restore_volume;
        }
        self.is_muted = false;
    }

    /// Progress through the item in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Navigation state of a carousel instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselState {
    pub current_index: usize,
    pub is_navigating: bool,
    pub slide_direction: SlideDirection,
}
