//! API routes.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    delete_video, get_session, get_video, health, list_videos, ready, render_snippet,
    upload_thumbnail, upload_video, verify_session,
};
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
///
/// Every API route is served both at the root and under `/api`.
pub fn create_router(state: AppState) -> Router {
    let video_routes = Router::new()
        .route("/list-videos", get(list_videos))
        .route("/upload", post(upload_video))
        .route("/upload-thumbnail", post(upload_thumbnail))
        .route("/videos/*key", get(get_video).delete(delete_video));

    let snippet_routes = Router::new().route("/snippet", post(render_snippet));

    let session_routes = Router::new()
        .route("/session/verify", post(verify_session))
        .route("/session/:session_id", get(get_session));

    let rate_limiter = Arc::new(RateLimiterCache::new(
        state.config.rate_limit_rps,
        state.config.rate_limit_burst,
    ));

    let api_routes = Router::new()
        .merge(video_routes)
        .merge(snippet_routes)
        .merge(session_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    Router::new()
        .merge(api_routes.clone())
        .nest("/api", api_routes)
        .merge(health_routes)
        // Multipart uploads are checked against the extractor limit too
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
