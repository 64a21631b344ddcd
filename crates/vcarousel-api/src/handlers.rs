//! Request handlers.

pub mod health;
pub mod session;
pub mod snippet;
pub mod videos;

pub use health::*;
pub use session::*;
pub use snippet::*;
pub use videos::*;
