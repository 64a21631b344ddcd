//! The carousel: navigator, per-item state, controller and timers composed
//! into one single-threaded component.
//!
//! Exactly one item is mounted at a time. Per-item [`PlaybackState`] is
//! created lazily the first time an index becomes active and is kept (frozen)
//! while other items are shown.

use std::collections::HashMap;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use vcarousel_models::{classify, MediaItem, MediaSource, PlaybackRate, SourceKind};

use crate::backend::{EmbedEvent, FullscreenTarget, MediaEvent, Mount, MountId, PlayerFactory};
use crate::config::PlayerConfig;
use crate::controller::PlaybackController;
use crate::controls::ControlsVisibility;
use crate::error::PlayerResult;
use crate::media_error::{MediaErrorKind, PlaybackFailure};
use crate::navigator::{CarouselNavigator, Transition};
use crate::state::{CarouselState, PlaybackState};

/// Keys the carousel reacts to while mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Other,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_dom(key: &str) -> Self {
        match key {
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            _ => Key::Other,
        }
    }
}

/// Render-ready view of a carousel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselSnapshot {
    pub carousel: CarouselState,
    pub item_count: usize,
    pub current_item: Option<MediaItem>,
    pub source_kind: Option<SourceKind>,
    pub playback: Option<PlaybackState>,
    pub controls_visible: bool,
    pub can_go_previous: bool,
    pub can_go_next: bool,
}

/// A carousel instance bound to its own player factory.
pub struct Carousel<F: PlayerFactory> {
    config: PlayerConfig,
    items: Vec<MediaItem>,
    sources: Vec<MediaSource>,
    navigator: CarouselNavigator,
    states: HashMap<usize, PlaybackState>,
    controller: PlaybackController,
    controls: ControlsVisibility,
    factory: F,
    fullscreen: Option<Box<dyn FullscreenTarget>>,
    generation: u64,
}

impl<F: PlayerFactory> std::fmt::Debug for Carousel<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Carousel")
            .field("container_id", &self.config.container_id)
            .field("items", &self.items.len())
            .field("state", &self.navigator.state())
            .field("controller", &self.controller)
            .finish()
    }
}

impl<F: PlayerFactory> Carousel<F> {
    /// Create a carousel and mount its first item.
    pub fn new(items: Vec<MediaItem>, factory: F, config: PlayerConfig) -> Self {
        let sources = items.iter().map(|item| classify(&item.url)).collect();
        let navigator = CarouselNavigator::new(items.len(), config.settle_delay);
        let controller = PlaybackController::new(
            config.page_origin.clone(),
            config.autoplay,
            config.loop_playback,
        );
        let controls = ControlsVisibility::new(
            config.show_controls,
            config.controls_idle_hide,
            config.controls_leave_hide,
        );

        let mut carousel = Self {
            config,
            items,
            sources,
            navigator,
            states: HashMap::new(),
            controller,
            controls,
            factory,
            fullscreen: None,
            generation: 0,
        };

        info!(
            container_id = %carousel.config.container_id,
            items = carousel.items.len(),
            "Carousel created"
        );
        carousel.activate(0);
        carousel.controls.reset(Instant::now());
        carousel
    }

    /// Attach the container's fullscreen surface.
    pub fn with_fullscreen(mut self, target: Box<dyn FullscreenTarget>) -> Self {
        self.fullscreen = Some(target);
        self
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn sources(&self) -> &[MediaSource] {
        &self.sources
    }

    pub fn current_index(&self) -> usize {
        self.navigator.current_index()
    }

    pub fn carousel_state(&self) -> CarouselState {
        self.navigator.state()
    }

    /// State of the item at `index`, if it has ever been active.
    pub fn state(&self, index: usize) -> Option<&PlaybackState> {
        self.states.get(&index)
    }

    pub fn active_state(&self) -> Option<&PlaybackState> {
        self.states.get(&self.current_index())
    }

    /// Mount of the active player; events must be tagged with it.
    pub fn active_mount(&self) -> Option<MountId> {
        self.controller.mount()
    }

    pub fn controls_visible(&self) -> bool {
        self.controls.is_visible()
    }

    pub fn can_go_previous(&self) -> bool {
        self.navigator.can_go_previous()
    }

    pub fn can_go_next(&self) -> bool {
        self.navigator.can_go_next()
    }

    pub fn snapshot(&self) -> CarouselSnapshot {
        let index = self.current_index();
        CarouselSnapshot {
            carousel: self.navigator.state(),
            item_count: self.items.len(),
            current_item: self.items.get(index).cloned(),
            source_kind: self.sources.get(index).map(MediaSource::kind),
            playback: self.states.get(&index).cloned(),
            controls_visible: self.controls.is_visible(),
            can_go_previous: self.navigator.can_go_previous(),
            can_go_next: self.navigator.can_go_next(),
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn go_next(&mut self, now: Instant) -> bool {
        let transition = self.navigator.go_next(now);
        self.apply_transition(transition, now)
    }

    pub fn go_previous(&mut self, now: Instant) -> bool {
        let transition = self.navigator.go_previous(now);
        self.apply_transition(transition, now)
    }

    pub fn go_to(&mut self, index: usize, now: Instant) -> bool {
        let transition = self.navigator.go_to(index, now);
        self.apply_transition(transition, now)
    }

    /// Keyboard binding: left arrow goes back, right arrow goes forward.
    pub fn handle_key(&mut self, key: Key, now: Instant) -> bool {
        match key {
            Key::ArrowLeft => self.go_previous(now),
            Key::ArrowRight => self.go_next(now),
            Key::Other => false,
        }
    }

    fn apply_transition(&mut self, transition: Option<Transition>, now: Instant) -> bool {
        let Some(transition) = transition else {
            return false;
        };

        self.deactivate(transition.from);
        self.activate(transition.to);
        self.controls.reset(now);
        true
    }

    fn deactivate(&mut self, index: usize) {
        if let Some(state) = self.states.get_mut(&index) {
            self.controller.stop(state);
        }
        if let Some(id) = self.controller.detach() {
            let mount = self.mount_for(id);
            self.factory.unmount(&mount);
        }
    }

    fn activate(&mut self, index: usize) {
        let Some(source) = self.sources.get(index).cloned() else {
            return;
        };

        let state = self
            .states
            .entry(index)
            .or_insert_with(|| PlaybackState::new(&self.config));

        if state.has_error {
            debug!(index, "Item failed earlier; not mounting until reload");
            return;
        }
        state.is_loading = true;
        state.is_playing = false;

        self.generation += 1;
        let mount = Mount {
            id: MountId {
                index,
                generation: self.generation,
            },
            element_id: self.config.mount_element_id(index),
        };

        if !source.is_playable() {
            let failure = PlaybackFailure::new(MediaErrorKind::SourceUnsupported)
                .with_detail("Not a supported or safe media URL");
            warn!(index, url = %self.items[index].url, "Unplayable media reference");
            state.mark_failed(failure);
            return;
        }

        let result = match &source {
            MediaSource::Native { url } => self
                .factory
                .create_native(&mount, url, &self.config)
                .map(|media| self.controller.attach_native(mount.id, url, media, state)),
            MediaSource::SharePlatform { video_id } => self
                .factory
                .create_embedded(&mount, video_id, &self.config)
                .map(|player| self.controller.attach_embedded(mount.id, video_id, player)),
            MediaSource::StreamingEmbed { embed_url } => self
                .factory
                .mount_iframe(&mount, embed_url, &self.config)
                .map(|()| {
                    self.controller.attach_iframe(mount.id, embed_url);
                    // No load events come from a bare iframe.
                    state.mark_loaded();
                }),
        };

        match result {
            Ok(()) => {
                debug!(index, generation = mount.id.generation, kind = ?source.kind(), "Item mounted");
                if self.config.autoplay && source.is_native() {
                    self.controller.play(state);
                }
            }
            Err(e) => {
                warn!(index, error = %e, "Failed to mount player");
                state.mark_failed(
                    PlaybackFailure::new(MediaErrorKind::Unknown).with_detail(e.to_string()),
                );
            }
        }
    }

    fn mount_for(&self, id: MountId) -> Mount {
        Mount {
            id,
            element_id: self.config.mount_element_id(id.index),
        }
    }

    /// Re-mount the active item with a fresh source, clearing any error.
    pub fn reload(&mut self) {
        let index = self.current_index();
        if let Some(id) = self.controller.detach() {
            let mount = self.mount_for(id);
            self.factory.unmount(&mount);
        }
        if let Some(state) = self.states.get_mut(&index) {
            state.reset_for_reload();
        }
        info!(index, "Reloading item");
        self.activate(index);
    }

    /// Stop and unmount the active player. The carousel stays inert until a
    /// navigation or reload mounts an item again.
    pub fn teardown(&mut self) {
        let index = self.current_index();
        self.deactivate(index);
        info!(index, "Carousel torn down");
    }

    // ------------------------------------------------------------------
    // Playback commands (active item only)
    // ------------------------------------------------------------------

    fn with_active<R>(&mut self, f: impl FnOnce(&mut PlaybackController, &mut PlaybackState) -> R) -> Option<R> {
        let index = self.navigator.current_index();
        let state = self.states.get_mut(&index)?;
        Some(f(&mut self.controller, state))
    }

    pub fn toggle_play(&mut self) {
        self.with_active(|c, s| c.toggle_play(s));
    }

    pub fn play(&mut self) {
        self.with_active(|c, s| c.play(s));
    }

    pub fn pause(&mut self) {
        self.with_active(|c, s| c.pause(s));
    }

    pub fn seek(&mut self, seconds: f64) {
        self.with_active(|c, s| c.seek(s, seconds));
    }

    pub fn skip_back(&mut self) {
        self.with_active(|c, s| c.skip_back(s));
    }

    pub fn skip_forward(&mut self) {
        self.with_active(|c, s| c.skip_forward(s));
    }

    pub fn reset_to_start(&mut self) {
        self.with_active(|c, s| c.reset_to_start(s));
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.with_active(|c, s| c.set_muted(s, muted));
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.with_active(|c, s| c.set_volume(s, volume));
    }

    pub fn set_playback_rate(&mut self, rate: PlaybackRate) {
        self.with_active(|c, s| c.set_playback_rate(s, rate));
    }

    pub fn toggle_fullscreen(&mut self) -> PlayerResult<()> {
        match self.fullscreen.as_deref_mut() {
            Some(target) => self.controller.toggle_fullscreen(target),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Player events
    // ------------------------------------------------------------------

    fn is_current(&self, mount: MountId) -> bool {
        self.controller.mount() == Some(mount)
    }

    /// Apply an event from a native player. Events from detached players are
    /// dropped.
    pub fn handle_media_event(&mut self, mount: MountId, event: MediaEvent) -> bool {
        if !self.is_current(mount) {
            debug!(index = mount.index, generation = mount.generation, "Dropping stale media event");
            return false;
        }
        self.with_active(|c, s| c.handle_media_event(s, event)).is_some()
    }

    /// Apply a callback from the embedded player. Events from detached
    /// players are dropped.
    pub fn handle_embed_event(&mut self, mount: MountId, event: EmbedEvent) -> bool {
        if !self.is_current(mount) {
            debug!(index = mount.index, generation = mount.generation, "Dropping stale embed event");
            return false;
        }
        self.with_active(|c, s| c.handle_embed_event(s, event)).is_some()
    }

    /// Whether the active player needs time polling.
    pub fn needs_embed_poll(&self) -> bool {
        self.controller.kind() == Some(SourceKind::SharePlatform)
            && self.active_state().is_some_and(|s| s.is_playing)
    }

    pub fn poll_embedded(&mut self) {
        self.with_active(|c, s| c.poll_embedded(s));
    }

    // ------------------------------------------------------------------
    // Pointer activity and timers
    // ------------------------------------------------------------------

    pub fn pointer_move(&mut self, now: Instant) {
        self.controls.pointer_move(now);
    }

    pub fn pointer_leave(&mut self, now: Instant) {
        self.controls.pointer_leave(now);
    }

    /// Earliest pending timer deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.navigator.next_deadline(), self.controls.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fire every timer whose deadline has passed.
    pub fn tick(&mut self, now: Instant) {
        if self.navigator.tick(now) {
            debug!(index = self.current_index(), "Navigation settled");
        }
        self.controls.tick(now);
    }
}
