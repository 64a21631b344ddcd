//! Short-lived sessions issued after a Turnstile captcha check.
//!
//! A client posts its Turnstile token; once the token verifies, a random
//! session id with a fixed TTL is issued and, when configured, a webhook is
//! notified. Sessions live in process memory only.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

pub const DEFAULT_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Session handler configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Turnstile secret; verification is refused without one
    pub turnstile_secret: Option<String>,
    pub verify_url: String,
    pub ttl: Duration,
    /// Endpoint notified of every new session
    pub webhook_url: Option<String>,
    pub webhook_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turnstile_secret: None,
            verify_url: DEFAULT_VERIFY_URL.to_string(),
            ttl: Duration::from_secs(300),
            webhook_url: None,
            webhook_timeout: Duration::from_secs(5),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            turnstile_secret: std::env::var("TURNSTILE_SECRET_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            verify_url: std::env::var("TURNSTILE_VERIFY_URL").unwrap_or(defaults.verify_url),
            ttl: std::env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.ttl),
            webhook_url: std::env::var("SESSION_WEBHOOK_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            webhook_timeout: std::env::var("SESSION_WEBHOOK_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.webhook_timeout),
        }
    }
}

/// An issued session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl Session {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// In-memory session table with a fixed TTL.
#[derive(Debug)]
pub struct SessionStore {
    ttl: chrono::Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::minutes(5)),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Issue a new session, dropping any that have expired.
    pub async fn create(&self, hostname: Option<String>, now: DateTime<Utc>) -> Session {
        let session = Session {
            session_id: Uuid::new_v4().to_string(),
            created_at: now,
            expires_at: now + self.ttl,
            hostname,
        };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.is_live(now));
        sessions.insert(session.session_id.clone(), session.clone());
        session
    }

    /// A live session, or `None` when unknown or expired.
    pub async fn get(&self, id: &str, now: DateTime<Utc>) -> Option<Session> {
        let session = self.sessions.read().await.get(id).cloned()?;
        if session.is_live(now) {
            return Some(session);
        }
        self.sessions.write().await.remove(id);
        None
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Siteverify response body.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnstileResponse {
    pub success: bool,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

/// Check a Turnstile token with the siteverify endpoint.
pub async fn verify_turnstile(
    client: &Client,
    config: &SessionConfig,
    token: &str,
    remote_ip: Option<&str>,
) -> ApiResult<TurnstileResponse> {
    let secret = config
        .turnstile_secret
        .as_deref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Turnstile is not configured".to_string()))?;

    let mut form = vec![("secret", secret), ("response", token)];
    if let Some(ip) = remote_ip {
        form.push(("remoteip", ip));
    }

    let response = client
        .post(&config.verify_url)
        .form(&form)
        .send()
        .await
        .map_err(|e| ApiError::Upstream(format!("Turnstile request failed: {}", e)))?
        .error_for_status()
        .map_err(|e| ApiError::Upstream(format!("Turnstile returned an error: {}", e)))?
        .json::<TurnstileResponse>()
        .await
        .map_err(|e| ApiError::Upstream(format!("Invalid Turnstile response: {}", e)))?;

    debug!(success = response.success, codes = ?response.error_codes, "Turnstile verification");
    Ok(response)
}

/// Webhook payload for a new session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent<'a> {
    pub event: &'static str,
    #[serde(flatten)]
    pub session: &'a Session,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a serde_json::Value>,
}

/// Validate a webhook endpoint: absolute http(s) URL.
pub fn parse_webhook_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// POST the session to the configured webhook. Failures are logged only.
pub async fn notify_webhook(
    client: &Client,
    config: &SessionConfig,
    session: &Session,
    metadata: Option<&serde_json::Value>,
) {
    let Some(raw) = config.webhook_url.as_deref() else {
        return;
    };
    let Some(url) = parse_webhook_url(raw) else {
        warn!(url = %raw, "Ignoring invalid session webhook URL");
        return;
    };

    let event = SessionEvent {
        event: "session.created",
        session,
        metadata,
    };

    match client
        .post(url)
        .timeout(config.webhook_timeout)
        .json(&event)
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => {
            info!(session_id = %session.session_id, "Session webhook delivered");
        }
        Ok(response) => {
            warn!(session_id = %session.session_id, status = %response.status(), "Session webhook rejected");
        }
        Err(e) => {
            warn!(session_id = %session.session_id, error = %e, "Session webhook failed");
        }
    }
}
