//! Playback controller.
//!
//! Dispatches playback commands to whichever player is attached for the
//! active item and folds player events back into that item's
//! [`PlaybackState`]. Every command is a no-op when no controllable player
//! handle is attached (nothing mounted, or a streaming iframe).

use tracing::{debug, warn};
use vcarousel_models::{PlaybackRate, SourceKind};

use crate::backend::{EmbedEvent, EmbedPlayerState, EmbeddedPlayer, FullscreenTarget, MediaEvent, MountId, NativeMedia};
use crate::error::PlayerResult;
use crate::media_error::PlaybackFailure;
use crate::state::PlaybackState;

/// Seconds moved by skip back / skip forward.
pub const SKIP_SECONDS: f64 = 10.0;

enum ActivePlayer {
    Native(Box<dyn NativeMedia>),
    Embedded(Box<dyn EmbeddedPlayer>),
    Iframe,
}

/// Commands the player of the active carousel item.
#[derive(Default)]
pub struct PlaybackController {
    player: Option<ActivePlayer>,
    mount: Option<MountId>,
    url: String,
    page_origin: Option<String>,
    autoplay: bool,
    loop_playback: bool,
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("kind", &self.kind())
            .field("mount", &self.mount)
            .field("url", &self.url)
            .finish()
    }
}

impl PlaybackController {
    pub fn new(page_origin: Option<String>, autoplay: bool, loop_playback: bool) -> Self {
        Self {
            player: None,
            mount: None,
            url: String::new(),
            page_origin,
            autoplay,
            loop_playback,
        }
    }

    /// Attach a native media element and push the item's preferences to it.
    pub fn attach_native(
        &mut self,
        mount: MountId,
        url: &str,
        mut media: Box<dyn NativeMedia>,
        state: &PlaybackState,
    ) {
        media.set_volume(f64::from(state.volume) / 100.0);
        media.set_muted(state.is_muted);
        media.set_playback_rate(state.playback_rate.as_f64());

        self.player = Some(ActivePlayer::Native(media));
        self.mount = Some(mount);
        self.url = url.to_string();
        debug!(index = mount.index, generation = mount.generation, "Attached native player");
    }

    /// Attach the embedded share-platform player. Preferences are pushed once
    /// it reports ready.
    pub fn attach_embedded(&mut self, mount: MountId, video_id: &str, player: Box<dyn EmbeddedPlayer>) {
        self.player = Some(ActivePlayer::Embedded(player));
        self.mount = Some(mount);
        self.url = video_id.to_string();
        debug!(index = mount.index, generation = mount.generation, "Attached embedded player");
    }

    /// Record a streaming iframe mount, which has no control API.
    pub fn attach_iframe(&mut self, mount: MountId, embed_url: &str) {
        self.player = Some(ActivePlayer::Iframe);
        self.mount = Some(mount);
        self.url = embed_url.to_string();
    }

    /// Drop the attached player, destroying an embedded one.
    pub fn detach(&mut self) -> Option<MountId> {
        if let Some(ActivePlayer::Embedded(player)) = self.player.as_mut() {
            player.destroy();
        }
        self.player = None;
        self.url.clear();
        self.mount.take()
    }

    /// Mount currently commanded by this controller.
    pub fn mount(&self) -> Option<MountId> {
        self.mount
    }

    pub fn kind(&self) -> Option<SourceKind> {
        self.player.as_ref().map(|p| match p {
            ActivePlayer::Native(_) => SourceKind::Native,
            ActivePlayer::Embedded(_) => SourceKind::SharePlatform,
            ActivePlayer::Iframe => SourceKind::StreamingEmbed,
        })
    }

    /// Whether a controllable handle is attached.
    pub fn has_handle(&self) -> bool {
        matches!(
            self.player,
            Some(ActivePlayer::Native(_)) | Some(ActivePlayer::Embedded(_))
        )
    }

    /// Pause and rewind a native player before it is replaced. Other player
    /// kinds are left alone; they are simply unmounted.
    pub fn stop(&mut self, state: &mut PlaybackState) {
        if let Some(ActivePlayer::Native(media)) = self.player.as_mut() {
            media.pause();
            media.set_current_time(0.0);
            state.is_playing = false;
            state.current_time = 0.0;
        }
    }

    pub fn toggle_play(&mut self, state: &mut PlaybackState) {
        if state.is_playing {
            self.pause(state);
        } else {
            self.play(state);
        }
    }

    pub fn play(&mut self, state: &mut PlaybackState) {
        match self.player.as_mut() {
            Some(ActivePlayer::Native(media)) => match media.play() {
                Ok(()) => state.is_playing = true,
                Err(e) => {
                    warn!(url = %self.url, error = %e, "Native play request rejected");
                    state.is_playing = false;
                }
            },
            Some(ActivePlayer::Embedded(player)) => {
                player.play_video();
                state.is_playing = true;
            }
            _ => {}
        }
    }

    pub fn pause(&mut self, state: &mut PlaybackState) {
        match self.player.as_mut() {
            Some(ActivePlayer::Native(media)) => {
                media.pause();
                state.is_playing = false;
            }
            Some(ActivePlayer::Embedded(player)) => {
                player.pause_video();
                state.is_playing = false;
            }
            _ => {}
        }
    }

    /// Seek, clamped to `[0, duration]`. `current_time` is updated before the
    /// player confirms.
    pub fn seek(&mut self, state: &mut PlaybackState, seconds: f64) {
        if !self.has_handle() || seconds.is_nan() {
            return;
        }
        let target = state.clamp_time(seconds);

        match self.player.as_mut() {
            Some(ActivePlayer::Native(media)) => media.set_current_time(target),
            Some(ActivePlayer::Embedded(player)) => player.seek_to(target, true),
            _ => return,
        }
        state.current_time = target;
    }

    pub fn skip_back(&mut self, state: &mut PlaybackState) {
        let target = state.current_time - SKIP_SECONDS;
        self.seek(state, target);
    }

    pub fn skip_forward(&mut self, state: &mut PlaybackState) {
        let target = state.current_time + SKIP_SECONDS;
        self.seek(state, target);
    }

    pub fn reset_to_start(&mut self, state: &mut PlaybackState) {
        self.seek(state, 0.0);
    }

    /// Mute or unmute. Unmuting at volume 0 restores the last audible volume.
    pub fn set_muted(&mut self, state: &mut PlaybackState, muted: bool) {
        if !self.has_handle() {
            return;
        }
        let volume_before = state.volume;
        state.apply_muted(muted);

        match self.player.as_mut() {
            Some(ActivePlayer::Native(media)) => {
                if state.volume != volume_before {
                    media.set_volume(f64::from(state.volume) / 100.0);
                }
                media.set_muted(state.is_muted);
            }
            Some(ActivePlayer::Embedded(player)) => {
                if state.volume != volume_before {
                    player.set_volume(state.volume);
                }
                if state.is_muted {
                    player.mute();
                } else {
                    player.un_mute();
                }
            }
            _ => {}
        }
    }

    /// Set volume (0-100). 0 mutes; any positive volume unmutes.
    pub fn set_volume(&mut self, state: &mut PlaybackState, volume: u8) {
        if !self.has_handle() {
            return;
        }
        state.apply_volume(volume);

        match self.player.as_mut() {
            Some(ActivePlayer::Native(media)) => {
                media.set_volume(f64::from(state.volume) / 100.0);
                media.set_muted(state.is_muted);
            }
            Some(ActivePlayer::Embedded(player)) => {
                player.set_volume(state.volume);
                if state.is_muted {
                    player.mute();
                } else {
                    player.un_mute();
                }
            }
            _ => {}
        }
    }

    pub fn set_playback_rate(&mut self, state: &mut PlaybackState, rate: PlaybackRate) {
        match self.player.as_mut() {
            Some(ActivePlayer::Native(media)) => media.set_playback_rate(rate.as_f64()),
            Some(ActivePlayer::Embedded(player)) => player.set_playback_rate(rate.as_f64()),
            _ => return,
        }
        state.playback_rate = rate;
    }

    /// Enter fullscreen on the container, or leave it if already fullscreen.
    pub fn toggle_fullscreen(&self, target: &mut dyn FullscreenTarget) -> PlayerResult<()> {
        if self.player.is_none() {
            return Ok(());
        }
        if target.is_fullscreen() {
            target.exit_fullscreen()
        } else {
            target.request_fullscreen()
        }
    }

    /// Fold a native media event into the item state.
    pub fn handle_media_event(&mut self, state: &mut PlaybackState, event: MediaEvent) {
        match event {
            MediaEvent::LoadedMetadata { duration } => state.set_duration(duration),
            MediaEvent::LoadedData => state.mark_loaded(),
            MediaEvent::TimeUpdate { current_time } => state.set_current_time(current_time),
            MediaEvent::Play => state.is_playing = true,
            MediaEvent::Pause | MediaEvent::Ended => state.is_playing = false,
            MediaEvent::VolumeChange { volume, muted } => {
                let volume = (volume.clamp(0.0, 1.0) * 100.0).round() as u8;
                state.volume = volume;
                if volume > 0 {
                    state.restore_volume = volume;
                }
                state.is_muted = muted || volume == 0;
            }
            MediaEvent::RateChange { rate } => match PlaybackRate::from_reported(rate) {
                Some(rate) => state.playback_rate = rate,
                None => debug!(rate, "Ignoring unsupported playback rate from player"),
            },
            MediaEvent::Error { code } => {
                let failure =
                    PlaybackFailure::from_media_error(code, &self.url, self.page_origin.as_deref());
                warn!(
                    url = %self.url,
                    code = ?code,
                    kind = ?failure.kind,
                    cross_origin = failure.cross_origin_suspected,
                    "Native playback failed"
                );
                state.mark_failed(failure);
            }
        }
    }

    /// Fold an embedded player callback into the item state.
    pub fn handle_embed_event(&mut self, state: &mut PlaybackState, event: EmbedEvent) {
        let autoplay = self.autoplay;
        let loop_playback = self.loop_playback;
        let Some(ActivePlayer::Embedded(player)) = self.player.as_mut() else {
            return;
        };

        match event {
            EmbedEvent::Ready => {
                state.mark_loaded();
                state.set_duration(player.get_duration());
                player.set_volume(state.volume);
                if state.is_muted {
                    player.mute();
                } else {
                    player.un_mute();
                }
                player.set_playback_rate(state.playback_rate.as_f64());
                if autoplay && !state.has_error {
                    player.play_video();
                    state.is_playing = true;
                }
            }
            EmbedEvent::StateChange { state: embed_state } => match embed_state {
                EmbedPlayerState::Playing => {
                    state.mark_loaded();
                    state.is_playing = true;
                }
                EmbedPlayerState::Ended if loop_playback => {
                    player.seek_to(0.0, true);
                    player.play_video();
                    state.current_time = 0.0;
                    state.is_playing = true;
                }
                EmbedPlayerState::Ended => {
                    state.is_playing = false;
                    state.set_current_time(state.duration);
                }
                EmbedPlayerState::Paused | EmbedPlayerState::Cued | EmbedPlayerState::Unstarted => {
                    state.is_playing = false;
                }
                EmbedPlayerState::Buffering => {}
            },
            EmbedEvent::Error { code } => {
                let failure = PlaybackFailure::from_embed_error(code);
                warn!(video_id = %self.url, code, kind = ?failure.kind, "Embedded playback failed");
                state.mark_failed(failure);
            }
        }
    }

    /// Refresh time and duration from the embedded player, which has no
    /// time events of its own.
    pub fn poll_embedded(&mut self, state: &mut PlaybackState) {
        if let Some(ActivePlayer::Embedded(player)) = self.player.as_ref() {
            state.set_duration(player.get_duration());
            state.set_current_time(player.get_current_time());
        }
    }
}
