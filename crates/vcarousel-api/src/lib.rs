//! Axum HTTP API server.
//!
//! This crate provides:
//! - Video bucket CRUD (list, upload, ranged streaming, delete, thumbnails)
//! - Carousel snippet rendering
//! - Turnstile-verified short-lived sessions with an optional webhook
//! - Rate limiting, CORS and security headers

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;

pub use config::{ApiConfig, StorageBackend};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use session::{Session, SessionConfig, SessionStore};
pub use state::AppState;
