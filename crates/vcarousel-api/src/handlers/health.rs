//! Liveness and readiness probes.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Ok,
    Error,
    /// Optional dependency that is not configured
    Disabled,
}

#[derive(Serialize)]
pub struct DependencyCheck {
    pub status: CheckState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub storage: DependencyCheck,
    pub turnstile: DependencyCheck,
}

/// GET /ready
///
/// Unready (503) only when the bucket cannot be reached. Sessions without a
/// Turnstile secret are reported as disabled.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let started = Instant::now();
    let storage = match state.storage.check_connectivity().await {
        Ok(()) => DependencyCheck {
            status: CheckState::Ok,
            error: None,
            latency_ms: Some(started.elapsed().as_millis() as u64),
        },
        Err(e) => DependencyCheck {
            status: CheckState::Error,
            error: Some(e.to_string()),
            latency_ms: None,
        },
    };

    let turnstile = DependencyCheck {
        status: if state.config.session.turnstile_secret.is_some() {
            CheckState::Ok
        } else {
            CheckState::Disabled
        },
        error: None,
        latency_ms: None,
    };

    let ready = storage.status != CheckState::Error;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            status: if ready { "ready" } else { "degraded" },
            storage,
            turnstile,
        }),
    )
}
