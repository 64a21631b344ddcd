//! Session handlers.

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::session::{notify_webhook, verify_turnstile};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Turnstile widget token
    #[serde(alias = "cf-turnstile-response")]
    pub token: String,
    /// Forwarded untouched to the webhook
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Exchange a Turnstile token for a session.
///
/// POST /session/verify
pub async fn verify_session(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<std::net::SocketAddr>>,
    headers: HeaderMap,
    Json(request): Json<VerifyRequest>,
) -> ApiResult<(StatusCode, Json<VerifyResponse>)> {
    let token = request.token.trim();
    if token.is_empty() {
        return Err(ApiError::bad_request("Missing Turnstile token"));
    }

    let remote_ip = headers
        .get("CF-Connecting-IP")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()));

    let outcome = verify_turnstile(&state.http, &state.config.session, token, remote_ip.as_deref()).await?;
    if !outcome.success {
        warn!(codes = ?outcome.error_codes, "Turnstile verification rejected");
        return Err(ApiError::forbidden(format!(
            "Turnstile verification failed: {}",
            if outcome.error_codes.is_empty() {
                "unknown".to_string()
            } else {
                outcome.error_codes.join(", ")
            }
        )));
    }

    let session = state.sessions.create(outcome.hostname, Utc::now()).await;
    info!(session_id = %session.session_id, expires_at = %session.expires_at, "Session created");

    if state.config.session.webhook_url.is_some() {
        let http = state.http.clone();
        let config = state.config.session.clone();
        let session = session.clone();
        tokio::spawn(async move {
            notify_webhook(&http, &config, &session, request.metadata.as_ref()).await;
        });
    }

    Ok((
        StatusCode::CREATED,
        Json(VerifyResponse {
            session_id: session.session_id,
            expires_at: session.expires_at,
            ttl_seconds: state.config.session.ttl.as_secs(),
        }),
    ))
}

/// Look up a live session.
///
/// GET /session/:session_id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionStatusResponse>> {
    let session = state
        .sessions
        .get(&session_id, Utc::now())
        .await
        .ok_or_else(|| ApiError::not_found("Session not found or expired"))?;

    Ok(Json(SessionStatusResponse {
        session_id: session.session_id,
        expires_at: session.expires_at,
    }))
}
