//! Multi-source video playback and carousel navigation.
//!
//! This crate provides:
//! - Per-item playback state with optimistic writes and event-driven confirmation
//! - A playback controller dispatching to native media or an embedded player
//! - Carousel navigation with a settle-delay debounce
//! - Controls auto-hide timing and best-effort preloading of upcoming items
//! - A tokio driver that runs a carousel as a single event loop
//! - The embeddable HTML snippet emitter

pub mod backend;
pub mod carousel;
pub mod config;
pub mod controller;
pub mod controls;
pub mod driver;
pub mod error;
pub mod media_error;
pub mod navigator;
pub mod preload;
pub mod snippet;
pub mod state;

pub use backend::{
    EmbedEvent, EmbedPlayerState, EmbeddedPlayer, FullscreenTarget, MediaEvent, Mount, MountId,
    NativeMedia, PlayerFactory,
};
pub use carousel::{Carousel, CarouselSnapshot, Key};
pub use config::PlayerConfig;
pub use controller::PlaybackController;
pub use controls::ControlsVisibility;
pub use driver::{CarouselDriver, CarouselHandle, CarouselInput};
pub use error::{PlayerError, PlayerResult};
pub use media_error::{MediaErrorKind, PlaybackFailure};
pub use navigator::{CarouselNavigator, NavPhase, Transition};
pub use preload::{PreloadObserver, PreloadOutcome, PreloadResult, PreloadStatus, Preloader};
pub use snippet::{SnippetEmitter, SnippetItem, SnippetOptions};
pub use state::{CarouselState, PlaybackState};
