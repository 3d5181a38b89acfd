//! Shared state for HTTP handlers

use crate::auth::{Authenticator, UserDirectory, create_identity_provider};
use crate::config::AppConfig;
use crate::content::ContentRepository;
use crate::error::AppError;
use crate::metrics::GateMetrics;
use crate::quota::{AccessGate, DocumentUsageStore};
use crate::service::{ContentService, PageLimits};
use crate::store::SharedStore;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub service: ContentService,
    pub auth: Authenticator,
    pub metrics: Arc<GateMetrics>,
    /// Service name reported by `/health`
    pub name: Arc<str>,
    /// Document store backend reported by `/health`
    pub backend: &'static str,
}

impl AppState {
    /// Wire every component on top of one document store
    pub fn from_config(config: &AppConfig, store: SharedStore) -> Result<Self, AppError> {
        let collections = &config.store.collections;
        let metrics = Arc::new(GateMetrics::new());

        let usage = Arc::new(DocumentUsageStore::new(
            store.clone(),
            collections.usage.clone(),
        ));
        let gate = AccessGate::new(
            usage,
            metrics.clone(),
            config.quota.max_commit_attempts,
            Duration::from_millis(config.quota.retry_base_delay_ms),
        );
        let repository = ContentRepository::new(store.clone(), collections.clone());
        let service = ContentService::new(
            repository,
            gate,
            metrics.clone(),
            PageLimits {
                default_size: config.content.default_page_size,
                max_size: config.content.max_page_size,
            },
        );

        let provider = create_identity_provider(&config.auth)?;
        let directory = UserDirectory::new(store.clone(), collections.users.clone());

        Ok(Self {
            service,
            auth: Authenticator::new(provider, directory),
            metrics,
            name: Arc::from(config.server.name.as_str()),
            backend: store.backend_name(),
        })
    }
}
