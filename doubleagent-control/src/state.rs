use std::sync::Arc;

use axum::http::HeaderMap;
use doubleagent_core::{RuntimeConfig, DEFAULT_NAMESPACE, NAMESPACE_HEADER};
use doubleagent_store::NamespaceRouter;
use doubleagent_webhooks::WebhookEngine;

use crate::idempotency::IdempotencyCache;

/// Everything a vendor-shaped router and the control plane share for one
/// running service process. `Clone` is cheap — every field is `Arc`-backed
/// — so it can be handed to `axum::Router::with_state` directly, matching
/// the teacher's `AppState` pattern.
#[derive(Clone)]
pub struct ServiceState {
    pub service_name: Arc<str>,
    pub namespaces: Arc<NamespaceRouter>,
    pub webhooks: Arc<WebhookEngine>,
    pub idempotency: Arc<IdempotencyCache>,
    pub config: Arc<RuntimeConfig>,
}

impl ServiceState {
    pub fn new(service_name: &str, config: RuntimeConfig) -> Self {
        let webhooks = WebhookEngine::new(config.webhooks.clone());
        let idempotency = Arc::new(IdempotencyCache::new(config.idempotency.max_entries));
        Self {
            service_name: Arc::from(service_name),
            namespaces: Arc::new(NamespaceRouter::new()),
            webhooks,
            idempotency,
            config: Arc::new(config),
        }
    }

    /// Reads the namespace header, falling back to the reserved default
    /// when the client omits it.
    pub fn namespace(&self, headers: &HeaderMap) -> String {
        headers
            .get(NAMESPACE_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
            .to_string()
    }

    pub fn request_id(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(self.config.request_id_header.as_str())
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}
