//! Shared application state for the mpPortal gateway.
//!
//! Holds the validated config, the credential store, the message handler and
//! the deadline executor. Startup errors are returned, never panicked.

use std::sync::Arc;
use std::time::Duration;

use mpportal_core::error::Result;

use crate::config::PortalConfig;
use crate::credentials::{CredentialStore, StaticCredentialStore};
use crate::dispatch::{DeadlineExecutor, Dispatcher, MessageHandler};
use crate::obs::PortalMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    credentials: Arc<dyn CredentialStore>,
    handler: Arc<dyn MessageHandler>,
}

struct AppStateInner {
    cfg: PortalConfig,
    dispatcher: Dispatcher,
    executor: DeadlineExecutor,
    metrics: PortalMetrics,
}

impl AppState {
    /// Build state with the config-backed credential store and the default
    /// dispatcher as handler.
    pub fn new(cfg: PortalConfig) -> Result<Self> {
        let store = StaticCredentialStore::from_config(&cfg.apps)?;
        tracing::info!(apps = store.len(), "credential store loaded");
        let dispatcher = Dispatcher::new(cfg.replies.clone());
        Ok(Self::with_parts(cfg, Arc::new(store), Arc::new(dispatcher)))
    }

    /// Build state from explicit parts (custom stores/handlers, tests).
    pub fn with_parts(
        cfg: PortalConfig,
        credentials: Arc<dyn CredentialStore>,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        let dispatcher = Dispatcher::new(cfg.replies.clone());
        let executor = DeadlineExecutor::new(Duration::from_millis(cfg.gateway.reply_deadline_ms));
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                dispatcher,
                executor,
                metrics: PortalMetrics::default(),
            }),
            credentials,
            handler,
        }
    }

    pub fn cfg(&self) -> &PortalConfig {
        &self.inner.cfg
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn handler(&self) -> Arc<dyn MessageHandler> {
        Arc::clone(&self.handler)
    }

    /// Default dispatcher; also supplies the fallback reply.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn executor(&self) -> DeadlineExecutor {
        self.inner.executor
    }

    pub fn metrics(&self) -> &PortalMetrics {
        &self.inner.metrics
    }

    pub fn set_draining(&self) {
        self.inner.metrics.set_draining();
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }
}
