use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use doubleagent_core::{Resource, ResourceId, ResourceType, DEFAULT_NAMESPACE};

use crate::baseline::Baseline;
use crate::overlay::{Overlay, OverlayStats};

/// Routes every request to an isolated [`Overlay`] keyed by namespace,
/// all sharing one baseline `Arc` until [`NamespaceRouter::load_baseline`]
/// swaps it for every namespace at once.
///
/// Namespaces are created lazily on first access — there is no explicit
/// "create namespace" call, matching a client that starts sending
/// `X-DoubleAgent-Namespace: ci-run-42` without any setup step.
pub struct NamespaceRouter {
    baseline: arc_swap::ArcSwap<Baseline>,
    namespaces: DashMap<String, Arc<Overlay>>,
}

impl Default for NamespaceRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceRouter {
    pub fn new() -> Self {
        Self {
            baseline: arc_swap::ArcSwap::from(Arc::new(Baseline::new())),
            namespaces: DashMap::new(),
        }
    }

    /// Look up (creating if absent) the overlay for `namespace`.
    pub fn get_state(&self, namespace: &str) -> Arc<Overlay> {
        if let Some(overlay) = self.namespaces.get(namespace) {
            return overlay.clone();
        }
        let overlay = Arc::new(Overlay::new(self.baseline.load_full()));
        self.namespaces
            .entry(namespace.to_string())
            .or_insert(overlay)
            .clone()
    }

    pub fn default_state(&self) -> Arc<Overlay> {
        self.get_state(DEFAULT_NAMESPACE)
    }

    /// Replaces the shared baseline for every existing namespace and for
    /// any namespace created afterward, per the reference-shared baseline
    /// the router is built around.
    pub fn load_baseline(&self, data: HashMap<ResourceType, HashMap<ResourceId, Resource>>) {
        let baseline = Baseline::from_seed(data);
        self.baseline.store(baseline.clone());
        for entry in self.namespaces.iter() {
            entry.value().set_baseline(baseline.clone());
        }
    }

    pub fn reset_namespace(&self, namespace: &str) {
        if let Some(overlay) = self.namespaces.get(namespace) {
            overlay.reset();
        }
    }

    pub fn reset_namespace_hard(&self, namespace: &str) {
        if let Some(overlay) = self.namespaces.get(namespace) {
            overlay.reset_hard();
        }
    }

    pub fn reset_all(&self) {
        for entry in self.namespaces.iter() {
            entry.value().reset();
        }
    }

    pub fn reset_all_hard(&self) {
        for entry in self.namespaces.iter() {
            entry.value().reset_hard();
        }
    }

    pub fn delete_namespace(&self, namespace: &str) {
        self.namespaces.remove(namespace);
    }

    pub fn list_namespaces(&self) -> Vec<String> {
        self.namespaces.iter().map(|e| e.key().clone()).collect()
    }

    pub fn namespace_stats(&self, namespace: &str) -> HashMap<ResourceType, OverlayStats> {
        self.namespaces
            .get(namespace)
            .map(|overlay| overlay.stats())
            .unwrap_or_default()
    }
}
