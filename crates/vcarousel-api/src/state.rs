//! Application state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use vcarousel_storage::{MemoryStore, R2Client, StorageResult, VideoStore};

use crate::config::{ApiConfig, StorageBackend};
use crate::session::SessionStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: Arc<dyn VideoStore>,
    pub sessions: Arc<SessionStore>,
    /// Outbound client for Turnstile and session webhooks
    pub http: reqwest::Client,
}

impl AppState {
    /// Create state with the configured storage backend.
    pub async fn new(config: ApiConfig) -> StorageResult<Self> {
        let storage: Arc<dyn VideoStore> = match config.storage_backend {
            StorageBackend::R2 => Arc::new(R2Client::from_env().await?),
            StorageBackend::Memory => {
                warn!("Using in-memory storage; uploads are lost on restart");
                Arc::new(MemoryStore::new())
            }
        };
        info!(backend = ?config.storage_backend, "Storage ready");
        Ok(Self::with_store(config, storage))
    }

    /// Create state around an existing store.
    pub fn with_store(config: ApiConfig, storage: Arc<dyn VideoStore>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        let sessions = Arc::new(SessionStore::new(config.session.ttl));

        Self {
            config,
            storage,
            sessions,
            http,
        }
    }
}
