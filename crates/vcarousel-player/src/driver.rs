//! Tokio driver running one carousel as a single event loop.
//!
//! All inputs (user commands, player events, timer expiry, preload results)
//! are serialized through one task, so the carousel never needs locking.
//! Every handled input publishes a fresh [`CarouselSnapshot`] on a watch
//! channel when something changed.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use vcarousel_models::PlaybackRate;

use crate::backend::{EmbedEvent, MediaEvent, MountId, PlayerFactory};
use crate::carousel::{Carousel, CarouselSnapshot, Key};
use crate::error::{PlayerError, PlayerResult};
use crate::preload::{PreloadOutcome, Preloader};

const INPUT_BUFFER: usize = 64;

/// Everything the host can feed into a running carousel.
#[derive(Debug, Clone, PartialEq)]
pub enum CarouselInput {
    Next,
    Previous,
    GoTo(usize),
    Key(Key),
    TogglePlay,
    Play,
    Pause,
    Seek(f64),
    SkipBack,
    SkipForward,
    ResetToStart,
    SetMuted(bool),
    SetVolume(u8),
    SetPlaybackRate(PlaybackRate),
    ToggleFullscreen,
    Reload,
    PointerMove,
    PointerLeave,
    Media { mount: MountId, event: MediaEvent },
    Embed { mount: MountId, event: EmbedEvent },
    Shutdown,
}

/// Host-side handle to a running [`CarouselDriver`].
#[derive(Debug, Clone)]
pub struct CarouselHandle {
    inputs: mpsc::Sender<CarouselInput>,
    snapshots: watch::Receiver<CarouselSnapshot>,
}

impl CarouselHandle {
    pub async fn send(&self, input: CarouselInput) -> PlayerResult<()> {
        self.inputs
            .send(input)
            .await
            .map_err(|_| PlayerError::DriverClosed)
    }

    pub async fn next(&self) -> PlayerResult<()> {
        self.send(CarouselInput::Next).await
    }

    pub async fn previous(&self) -> PlayerResult<()> {
        self.send(CarouselInput::Previous).await
    }

    pub async fn shutdown(&self) -> PlayerResult<()> {
        self.send(CarouselInput::Shutdown).await
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> CarouselSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified on every published change.
    pub fn subscribe(&self) -> watch::Receiver<CarouselSnapshot> {
        self.snapshots.clone()
    }
}

/// Owns a carousel and runs it until shut down.
pub struct CarouselDriver<F: PlayerFactory> {
    carousel: Carousel<F>,
    preloader: Option<Preloader>,
    inputs: mpsc::Receiver<CarouselInput>,
    snapshots: watch::Sender<CarouselSnapshot>,
    preload_tx: mpsc::UnboundedSender<PreloadOutcome>,
    preload_rx: mpsc::UnboundedReceiver<PreloadOutcome>,
}

impl<F: PlayerFactory + 'static> CarouselDriver<F> {
    pub fn new(carousel: Carousel<F>, preloader: Option<Preloader>) -> (Self, CarouselHandle) {
        let (input_tx, inputs) = mpsc::channel(INPUT_BUFFER);
        let (snapshots, snapshot_rx) = watch::channel(carousel.snapshot());
        let (preload_tx, preload_rx) = mpsc::unbounded_channel();

        let driver = Self {
            carousel,
            preloader,
            inputs,
            snapshots,
            preload_tx,
            preload_rx,
        };
        let handle = CarouselHandle {
            inputs: input_tx,
            snapshots: snapshot_rx,
        };
        (driver, handle)
    }

    /// Run until [`CarouselInput::Shutdown`] arrives or every handle is
    /// dropped. The active player is torn down on exit.
    pub async fn run(mut self) {
        info!(items = self.carousel.items().len(), "Carousel driver started");
        self.schedule_preloads();

        let mut poll = tokio::time::interval(self.poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let deadline = self.carousel.next_deadline();
            let needs_poll = self.carousel.needs_embed_poll();

            tokio::select! {
                input = self.inputs.recv() => match input {
                    Some(CarouselInput::Shutdown) | None => break,
                    Some(input) => self.apply(input, Instant::now()),
                },
                _ = sleep_until(deadline) => self.carousel.tick(Instant::now()),
                _ = poll.tick(), if needs_poll => self.carousel.poll_embedded(),
                Some(outcome) = self.preload_rx.recv() => {
                    if let Some(preloader) = self.preloader.as_mut() {
                        preloader.record(&outcome);
                    }
                }
            }

            self.publish();
        }

        self.carousel.teardown();
        self.publish();
        info!("Carousel driver stopped");
    }

    fn poll_interval(&self) -> Duration {
        self.carousel
            .config()
            .embed_poll_interval
            .max(Duration::from_millis(1))
    }

    fn apply(&mut self, input: CarouselInput, now: Instant) {
        let navigated = match input {
            CarouselInput::Next => self.carousel.go_next(now),
            CarouselInput::Previous => self.carousel.go_previous(now),
            CarouselInput::GoTo(index) => self.carousel.go_to(index, now),
            CarouselInput::Key(key) => self.carousel.handle_key(key, now),
            CarouselInput::Reload => {
                self.carousel.reload();
                false
            }
            other => {
                self.apply_command(other, now);
                false
            }
        };

        if navigated {
            self.schedule_preloads();
        }
    }

    fn apply_command(&mut self, input: CarouselInput, now: Instant) {
        match input {
            CarouselInput::TogglePlay => self.carousel.toggle_play(),
            CarouselInput::Play => self.carousel.play(),
            CarouselInput::Pause => self.carousel.pause(),
            CarouselInput::Seek(seconds) => self.carousel.seek(seconds),
            CarouselInput::SkipBack => self.carousel.skip_back(),
            CarouselInput::SkipForward => self.carousel.skip_forward(),
            CarouselInput::ResetToStart => self.carousel.reset_to_start(),
            CarouselInput::SetMuted(muted) => self.carousel.set_muted(muted),
            CarouselInput::SetVolume(volume) => self.carousel.set_volume(volume),
            CarouselInput::SetPlaybackRate(rate) => self.carousel.set_playback_rate(rate),
            CarouselInput::ToggleFullscreen => {
                if let Err(e) = self.carousel.toggle_fullscreen() {
                    warn!(error = %e, "Fullscreen toggle failed");
                }
            }
            CarouselInput::PointerMove => self.carousel.pointer_move(now),
            CarouselInput::PointerLeave => self.carousel.pointer_leave(now),
            CarouselInput::Media { mount, event } => {
                self.carousel.handle_media_event(mount, event);
            }
            CarouselInput::Embed { mount, event } => {
                self.carousel.handle_embed_event(mount, event);
            }
            CarouselInput::Next
            | CarouselInput::Previous
            | CarouselInput::GoTo(_)
            | CarouselInput::Key(_)
            | CarouselInput::Reload
            | CarouselInput::Shutdown => {}
        }
    }

    fn schedule_preloads(&mut self) {
        let Some(preloader) = self.preloader.as_mut() else {
            return;
        };

        for url in preloader.plan(self.carousel.sources(), self.carousel.current_index()) {
            debug!(url = %url, "Scheduling preload");
            let fetch = preloader.fetch(url);
            let tx = self.preload_tx.clone();
            tokio::spawn(async move {
                let _ = tx.send(fetch.await);
            });
        }
    }

    fn publish(&self) {
        let snapshot = self.carousel.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
