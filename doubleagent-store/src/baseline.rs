use std::collections::HashMap;
use std::sync::Arc;

use doubleagent_core::{Resource, ResourceId, ResourceType};

/// Immutable seed data shared by reference across every namespace.
///
/// Loading a new baseline (via [`crate::NamespaceRouter::load_baseline`])
/// swaps the whole `Arc` rather than mutating it in place, so namespaces
/// that already hold a clone of the old `Arc` keep seeing the old data
/// until they explicitly reload — mirroring the reference-shared baseline
/// the original namespace router relied on.
#[derive(Debug, Default, Clone)]
pub struct Baseline {
    data: HashMap<ResourceType, HashMap<ResourceId, Resource>>,
}

impl Baseline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(data: HashMap<ResourceType, HashMap<ResourceId, Resource>>) -> Arc<Self> {
        Arc::new(Self { data })
    }

    pub fn get(&self, ty: &str, id: &str) -> Option<&Resource> {
        self.data.get(ty)?.get(id)
    }

    pub fn list(&self, ty: &str) -> impl Iterator<Item = (&ResourceId, &Resource)> {
        self.data.get(ty).into_iter().flat_map(|m| m.iter())
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.data.keys()
    }

    pub fn count(&self, ty: &str) -> usize {
        self.data.get(ty).map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.data.values().all(|m| m.is_empty())
    }
}
