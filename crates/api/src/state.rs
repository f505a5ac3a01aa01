use std::sync::Arc;

use adverify_core::gate::AccessGate;
use adverify_core::lifecycle::TokenLifecycle;
use adverify_core::notify::Notifier;
use adverify_db::MemoryTokenStore;
use adverify_events::{NoopNotifier, PostbackError, PostbackNotifier};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Token lifecycle manager (store, gate, postback dispatch).
    pub lifecycle: Arc<TokenLifecycle>,
    /// Server configuration (public URLs, page settings).
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire an in-memory store and the given notifier behind a lifecycle manager.
    pub fn new(config: ServerConfig, notifier: Arc<dyn Notifier>) -> Self {
        let lifecycle = TokenLifecycle::new(
            Arc::new(MemoryTokenStore::new()),
            notifier,
            AccessGate::new(config.bot_secret.clone()),
            config.policy.clone(),
        );
        Self {
            lifecycle: Arc::new(lifecycle),
            config: Arc::new(config),
        }
    }

    /// Build state with the notifier the configuration asks for.
    pub fn from_config(config: ServerConfig) -> Result<Self, PostbackError> {
        let notifier: Arc<dyn Notifier> = match &config.postback {
            Some(postback) => Arc::new(PostbackNotifier::new(postback.clone())?),
            None => {
                tracing::warn!("POSTBACK_URL_TEMPLATE is empty, postbacks disabled");
                Arc::new(NoopNotifier)
            }
        };
        Ok(Self::new(config, notifier))
    }
}
