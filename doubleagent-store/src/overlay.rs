use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use doubleagent_core::{Resource, ResourceId, ResourceType};

use crate::baseline::Baseline;

/// Per-namespace copy-on-write view over a shared [`Baseline`].
///
/// Writes never touch the baseline: `put` lands in `overlay`, `delete`
/// records a tombstone. Reads merge `overlay` over `baseline`, skipping
/// anything tombstoned. This lets many namespaces share one baseline
/// `Arc` without cloning its contents per namespace.
pub struct Overlay {
    baseline: arc_swap::ArcSwap<Baseline>,
    data: DashMap<ResourceType, HashMap<ResourceId, Resource>>,
    tombstones: DashMap<ResourceType, HashSet<ResourceId>>,
    counters: DashMap<ResourceType, AtomicU64>,
}

impl Overlay {
    pub fn new(baseline: Arc<Baseline>) -> Self {
        Self {
            baseline: arc_swap::ArcSwap::from(baseline),
            data: DashMap::new(),
            tombstones: DashMap::new(),
            counters: DashMap::new(),
        }
    }

    pub fn baseline(&self) -> Arc<Baseline> {
        self.baseline.load_full()
    }

    pub fn set_baseline(&self, baseline: Arc<Baseline>) {
        self.baseline.store(baseline);
    }

    fn is_tombstoned(&self, ty: &str, id: &str) -> bool {
        self.tombstones
            .get(ty)
            .map(|set| set.contains(id))
            .unwrap_or(false)
    }

    pub fn get(&self, ty: &str, id: &str) -> Option<Resource> {
        if self.is_tombstoned(ty, id) {
            return None;
        }
        if let Some(shard) = self.data.get(ty) {
            if let Some(r) = shard.get(id) {
                return Some(r.clone());
            }
        }
        self.baseline.load().get(ty, id).cloned()
    }

    pub fn put(&self, ty: &str, id: &str, resource: Resource) {
        if let Some(mut set) = self.tombstones.get_mut(ty) {
            set.remove(id);
        }
        self.data
            .entry(ty.to_string())
            .or_default()
            .insert(id.to_string(), resource);
    }

    /// Returns `true` if something (overlay or baseline) was visible before the delete.
    pub fn delete(&self, ty: &str, id: &str) -> bool {
        let existed = self.get(ty, id).is_some();
        if let Some(mut shard) = self.data.get_mut(ty) {
            shard.remove(id);
        }
        self.tombstones
            .entry(ty.to_string())
            .or_default()
            .insert(id.to_string());
        existed
    }

    pub fn list_all(&self, ty: &str) -> Vec<Resource> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        if let Some(shard) = self.data.get(ty) {
            for (id, resource) in shard.iter() {
                if !self.is_tombstoned(ty, id) {
                    seen.insert(id.clone());
                    out.push(resource.clone());
                }
            }
        }

        let baseline = self.baseline.load();
        for (id, resource) in baseline.list(ty) {
            if seen.contains(id) || self.is_tombstoned(ty, id) {
                continue;
            }
            out.push(resource.clone());
        }

        out
    }

    pub fn count(&self, ty: &str) -> usize {
        self.list_all(ty).len()
    }

    pub fn resource_types(&self) -> Vec<ResourceType> {
        let mut types: HashSet<ResourceType> = self.data.iter().map(|e| e.key().clone()).collect();
        for ty in self.baseline.load().resource_types() {
            types.insert(ty.clone());
        }
        types.into_iter().collect()
    }

    /// Monotonically increasing id, scoped per resource type per namespace.
    ///
    /// The counter is lazily seeded from the highest integer-parsing id
    /// already visible (baseline or overlay) so allocation never collides
    /// with a baseline id, even right after a `reset()` drops the counter.
    pub fn next_id(&self, ty: &str) -> u64 {
        if !self.counters.contains_key(ty) {
            let seed = self.max_existing_numeric_id(ty);
            self.counters.entry(ty.to_string()).or_insert_with(|| AtomicU64::new(seed));
        }
        self.counters.get(ty).expect("just inserted").fetch_add(1, Ordering::SeqCst) + 1
    }

    fn max_existing_numeric_id(&self, ty: &str) -> u64 {
        let mut max = 0u64;
        if let Some(shard) = self.data.get(ty) {
            for id in shard.keys() {
                if let Ok(n) = id.parse::<u64>() {
                    max = max.max(n);
                }
            }
        }
        for (id, _) in self.baseline.load().list(ty) {
            if let Ok(n) = id.parse::<u64>() {
                max = max.max(n);
            }
        }
        max
    }

    /// Clears mutations (overlay writes, tombstones, id counters) so the
    /// namespace reverts to exactly what the baseline holds.
    pub fn reset(&self) {
        self.data.clear();
        self.tombstones.clear();
        self.counters.clear();
    }

    /// Clears mutations AND hides every baseline resource, so the namespace
    /// reads as entirely empty until `put`/`seed`/`set_baseline` repopulate it.
    pub fn reset_hard(&self) {
        self.reset();
        let baseline = self.baseline.load();
        for ty in baseline.resource_types() {
            let mut set = self.tombstones.entry(ty.clone()).or_default();
            for (id, _) in baseline.list(ty) {
                set.insert(id.clone());
            }
        }
    }

    pub fn seed(&self, ty: &str, resources: Vec<Resource>) {
        for mut resource in resources {
            let id = doubleagent_core::resource::resource_id(&resource)
                .unwrap_or_else(|| self.next_id(ty).to_string());
            resource.entry("id").or_insert_with(|| id.clone().into());
            self.put(ty, &id, resource);
        }
    }

    pub fn stats(&self) -> HashMap<ResourceType, OverlayStats> {
        let mut out = HashMap::new();
        for ty in self.resource_types() {
            let baseline_count = self.baseline.load().count(&ty);
            let overlay_count = self.data.get(&ty).map(|s| s.len()).unwrap_or(0);
            let tombstoned = self.tombstones.get(&ty).map(|s| s.len()).unwrap_or(0);
            let visible = self.count(&ty);
            out.insert(
                ty,
                OverlayStats {
                    baseline_count,
                    overlay_count,
                    tombstoned,
                    visible,
                },
            );
        }
        out
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct OverlayStats {
    pub baseline_count: usize,
    pub overlay_count: usize,
    pub tombstoned: usize,
    pub visible: usize,
}
