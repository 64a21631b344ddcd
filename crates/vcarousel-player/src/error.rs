//! Player error types.

use thiserror::Error;

/// Result type for player operations.
pub type PlayerResult<T> = Result<T, PlayerError>;

/// Errors raised by player backends and the carousel driver.
///
/// Playback failures of a media item are not errors of this type; they are
/// recorded in that item's state (see [`crate::media_error`]).
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Failed to create player: {0}")]
    CreateFailed(String),

    #[error("Player command failed: {0}")]
    CommandFailed(String),

    #[error("Fullscreen request failed: {0}")]
    Fullscreen(String),

    #[error("Carousel driver has stopped")]
    DriverClosed,

    #[error("Preload request failed: {0}")]
    Preload(#[from] reqwest::Error),
}

impl PlayerError {
    pub fn create_failed(msg: impl Into<String>) -> Self {
        Self::CreateFailed(msg.into())
    }

    pub fn command_failed(msg: impl Into<String>) -> Self {
        Self::CommandFailed(msg.into())
    }
}
