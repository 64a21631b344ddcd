//! Best-effort preloading of upcoming carousel items.
//!
//! For the next few native items after the current index, the first bytes of
//! the resource are fetched so the browser/HTTP cache holds the metadata
//! before the user navigates there. Every planned URL ends up "attempted",
//! whether the fetch succeeded, failed or timed out. Failures never become
//! playback errors; they are logged and handed to an optional observer.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::RANGE;
use reqwest::Client;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;
use vcarousel_models::MediaSource;

use crate::config::PlayerConfig;
use crate::error::PlayerResult;

/// Preload progress of one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadStatus {
    Pending,
    Attempted,
}

/// How a preload ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreloadResult {
    Loaded { bytes: u64 },
    TimedOut,
    Failed { reason: String },
}

/// Result of one preload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadOutcome {
    pub url: String,
    pub result: PreloadResult,
    pub elapsed: Duration,
}

/// Diagnostics hook for preload results. Preloading is silent without one.
pub trait PreloadObserver: Send + Sync {
    fn on_outcome(&self, outcome: &PreloadOutcome);
}

/// Plans and performs preloads for one carousel.
#[derive(Clone)]
pub struct Preloader {
    client: Client,
    ahead: usize,
    max_bytes: u64,
    timeout: Duration,
    /// Page origin that relative item URLs are resolved against
    base: Option<Url>,
    status: HashMap<String, PreloadStatus>,
    observer: Option<Arc<dyn PreloadObserver>>,
}

impl fmt::Debug for Preloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preloader")
            .field("ahead", &self.ahead)
            .field("max_bytes", &self.max_bytes)
            .field("timeout", &self.timeout)
            .field("base", &self.base.as_ref().map(Url::as_str))
            .field("tracked", &self.status.len())
            .finish()
    }
}

impl Preloader {
    pub fn new(client: Client, config: &PlayerConfig) -> Self {
        Self {
            client,
            ahead: config.preload_ahead,
            max_bytes: config.preload_bytes.max(1),
            timeout: config.preload_timeout,
            base: config
                .page_origin
                .as_deref()
                .and_then(|origin| Url::parse(origin).ok()),
            status: HashMap::new(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PreloadObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// URLs to preload for the items following `current`.
    ///
    /// Only native items are considered, and a URL is never planned twice.
    /// Relative URLs are skipped unless a page origin is configured.
    /// Returned URLs are marked pending.
    pub fn plan(&mut self, sources: &[MediaSource], current: usize) -> Vec<String> {
        let mut planned = Vec::new();

        for source in sources.iter().skip(current + 1).take(self.ahead) {
            let MediaSource::Native { url } = source else {
                continue;
            };
            if url.is_empty() || self.status.contains_key(url) {
                continue;
            }
            if self.resolve(url).is_none() {
                debug!(url = %url, "No base to resolve preload URL against; skipping");
                continue;
            }
            self.status.insert(url.clone(), PreloadStatus::Pending);
            planned.push(url.clone());
        }

        planned
    }

    /// Record a finished preload and notify the observer.
    pub fn record(&mut self, outcome: &PreloadOutcome) {
        self.status.insert(outcome.url.clone(), PreloadStatus::Attempted);

        match &outcome.result {
            PreloadResult::Loaded { bytes } => {
                debug!(url = %outcome.url, bytes, elapsed_ms = outcome.elapsed.as_millis() as u64, "Preloaded");
            }
            PreloadResult::TimedOut => {
                debug!(url = %outcome.url, "Preload timed out");
            }
            PreloadResult::Failed { reason } => {
                warn!(url = %outcome.url, reason = %reason, "Preload failed");
            }
        }

        if let Some(observer) = &self.observer {
            observer.on_outcome(outcome);
        }
    }

    pub fn status(&self, url: &str) -> Option<PreloadStatus> {
        self.status.get(url).copied()
    }

    pub fn is_attempted(&self, url: &str) -> bool {
        self.status(url) == Some(PreloadStatus::Attempted)
    }

    /// Absolute `http`/`https` target for an item URL.
    pub fn resolve(&self, url: &str) -> Option<Url> {
        let resolved = match Url::parse(url) {
            Ok(absolute) => absolute,
            Err(url::ParseError::RelativeUrlWithoutBase) => self.base.as_ref()?.join(url).ok()?,
            Err(_) => return None,
        };
        matches!(resolved.scheme(), "http" | "https").then_some(resolved)
    }

    /// Future performing the preload of `url`, independent of `self`.
    ///
    /// The outcome carries `url` as given, so it matches the planned entry.
    pub fn fetch(&self, url: String) -> impl Future<Output = PreloadOutcome> + Send + 'static {
        let client = self.client.clone();
        let target = self.resolve(&url);
        let max_bytes = self.max_bytes;
        let timeout = self.timeout;
        async move {
            match target {
                Some(target) => preload(&client, url, target, max_bytes, timeout).await,
                None => PreloadOutcome {
                    url,
                    result: PreloadResult::Failed {
                        reason: "URL cannot be resolved to an http(s) address".to_string(),
                    },
                    elapsed: Duration::ZERO,
                },
            }
        }
    }
}

/// Fetch up to `max_bytes` of `target`, giving up after `timeout`. The
/// outcome is reported under `url`.
pub async fn preload(
    client: &Client,
    url: String,
    target: Url,
    max_bytes: u64,
    timeout: Duration,
) -> PreloadOutcome {
    let started = Instant::now();

    let result = match tokio::time::timeout(timeout, fetch_head_bytes(client, target, max_bytes)).await {
        Ok(Ok(bytes)) => PreloadResult::Loaded { bytes },
        Ok(Err(e)) => PreloadResult::Failed {
            reason: e.to_string(),
        },
        Err(_) => PreloadResult::TimedOut,
    };

    PreloadOutcome {
        url,
        result,
        elapsed: started.elapsed(),
    }
}

async fn fetch_head_bytes(client: &Client, url: Url, max_bytes: u64) -> PlayerResult<u64> {
    let mut response = client
        .get(url)
        .header(RANGE, format!("bytes=0-{}", max_bytes - 1))
        .send()
        .await?
        .error_for_status()?;

    // Servers ignoring the range header send the whole file; stop reading
    // once enough bytes have arrived.
    let mut received = 0u64;
    while let Some(chunk) = response.chunk().await? {
        received += chunk.len() as u64;
        if received >= max_bytes {
            break;
        }
    }

    Ok(received)
}
