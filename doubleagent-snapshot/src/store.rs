use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use doubleagent_core::error::DoubleAgentError;
use doubleagent_core::Resource;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::manifest::SnapshotManifest;

/// Resolves and writes the on-disk snapshot layout:
/// `<root>/<service>/<profile>/{manifest.json, <resource_type>.json}`.
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dir(&self, service: &str, profile: &str) -> PathBuf {
        self.root.join(service).join(profile)
    }

    /// Writes every resource type's file plus `manifest.json`, overwriting
    /// whatever a prior `save`/`save_incremental` left behind. Returns the
    /// snapshot directory.
    pub fn save(
        &self,
        service: &str,
        profile: &str,
        resources: &HashMap<String, Vec<Resource>>,
        connector: &str,
        redacted: bool,
    ) -> Result<PathBuf, DoubleAgentError> {
        let dir = self.dir(service, profile);
        fs::create_dir_all(&dir)?;

        let mut resource_counts = HashMap::new();
        let mut hasher = Sha256::new();

        let mut types: Vec<&String> = resources.keys().collect();
        types.sort();
        for rtype in types {
            let items = &resources[rtype];
            let body = serde_json::to_string_pretty(&sorted_keys(items))?;
            fs::write(dir.join(format!("{rtype}.json")), &body)?;
            resource_counts.insert(rtype.clone(), items.len());
            hasher.update(body.as_bytes());
        }

        let source_hash = format!("sha256:{}", hex::encode(hasher.finalize()));
        let mut manifest = SnapshotManifest::new(service, profile, connector, redacted, now_secs());
        manifest.resource_counts = resource_counts;
        manifest.source_hash = Some(source_hash);
        fs::write(dir.join("manifest.json"), serde_json::to_string_pretty(&manifest)?)?;

        Ok(dir)
    }

    /// Merges `resources` into whatever snapshot already exists at
    /// `(service, profile)`. For each resource type, an incoming record
    /// whose `id` already exists is **dropped** — the earlier trusted pull
    /// wins — matching `save_snapshot_incremental`'s semantics. A fresh
    /// `id` is appended. If no prior manifest exists this is equivalent to
    /// [`SnapshotStore::save`].
    pub fn save_incremental(
        &self,
        service: &str,
        profile: &str,
        resources: &HashMap<String, Vec<Resource>>,
        connector: &str,
        redacted: bool,
    ) -> Result<PathBuf, DoubleAgentError> {
        let dir = self.dir(service, profile);
        if !dir.join("manifest.json").exists() {
            return self.save(service, profile, resources, connector, redacted);
        }

        let existing_manifest = self.read_manifest(&dir)?;
        let mut rtypes: Vec<String> = existing_manifest.resource_counts.keys().cloned().collect();
        for rtype in resources.keys() {
            if !rtypes.contains(rtype) {
                rtypes.push(rtype.clone());
            }
        }

        let mut merged: HashMap<String, Vec<Resource>> = HashMap::new();
        for rtype in rtypes {
            let mut existing_items = self.read_resource_file(&dir, &rtype)?;
            let mut existing_ids: std::collections::HashSet<String> = existing_items
                .iter()
                .filter_map(doubleagent_core::resource::resource_id)
                .collect();

            if let Some(incoming) = resources.get(&rtype) {
                for item in incoming {
                    match doubleagent_core::resource::resource_id(item) {
                        Some(id) if existing_ids.contains(&id) => continue,
                        Some(id) => {
                            existing_ids.insert(id);
                            existing_items.push(item.clone());
                        }
                        None => existing_items.push(item.clone()),
                    }
                }
            }

            merged.insert(rtype, existing_items);
        }

        self.save(service, profile, &merged, connector, redacted)
    }

    /// Reads a manifest plus every referenced resource file, keyed the way
    /// [`doubleagent_store::Baseline::from_seed`] expects: `id` if present,
    /// else the row's position in the file (preserved verbatim per the
    /// spec's documented fallback-key collision behavior).
    pub fn load(
        &self,
        service: &str,
        profile: &str,
    ) -> Result<(SnapshotManifest, HashMap<String, HashMap<String, Resource>>), DoubleAgentError> {
        let dir = self.dir(service, profile);
        if !dir.join("manifest.json").exists() {
            return Err(DoubleAgentError::SnapshotNotFound {
                service: service.to_string(),
                profile: profile.to_string(),
            });
        }
        let manifest = self.read_manifest(&dir)?;

        let mut baseline = HashMap::new();
        for rtype in manifest.resource_counts.keys() {
            let items = self.read_resource_file(&dir, rtype)?;
            let mut keyed = HashMap::new();
            for (idx, item) in items.into_iter().enumerate() {
                let key = doubleagent_core::resource::resource_id(&item).unwrap_or_else(|| idx.to_string());
                keyed.insert(key, item);
            }
            baseline.insert(rtype.clone(), keyed);
        }

        Ok((manifest, baseline))
    }

    /// Lists manifests, optionally scoped to one service.
    pub fn list(&self, service: Option<&str>) -> Vec<SnapshotManifest> {
        let mut out = Vec::new();
        let service_dirs: Vec<PathBuf> = match service {
            Some(s) => vec![self.root.join(s)],
            None => read_subdirs(&self.root),
        };
        for service_dir in service_dirs {
            for profile_dir in read_subdirs(&service_dir) {
                if let Ok(manifest) = self.read_manifest(&profile_dir) {
                    out.push(manifest);
                }
            }
        }
        out
    }

    pub fn delete(&self, service: &str, profile: &str) -> bool {
        let dir = self.dir(service, profile);
        if dir.exists() {
            let _ = fs::remove_dir_all(&dir);
            true
        } else {
            false
        }
    }

    fn read_manifest(&self, dir: &Path) -> Result<SnapshotManifest, DoubleAgentError> {
        let text = fs::read_to_string(dir.join("manifest.json"))?;
        Ok(serde_json::from_str(&text)?)
    }

    fn read_resource_file(&self, dir: &Path, rtype: &str) -> Result<Vec<Resource>, DoubleAgentError> {
        let path = dir.join(format!("{rtype}.json"));
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(path)?;
        let items: Vec<Resource> = serde_json::from_str(&text)?;
        Ok(items)
    }
}

fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn read_subdirs(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect()
        })
        .unwrap_or_default()
}

/// Recursively re-emits resources with object keys sorted, so pretty-printed
/// output is stable across runs regardless of field insertion order.
fn sorted_keys(items: &[Resource]) -> Value {
    Value::Array(items.iter().map(|r| sort_value(&Value::Object(r.clone()))).collect())
}

fn sort_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted.insert(key.clone(), sort_value(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_value).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(v: Value) -> Resource {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn save_then_load_round_trips_counts() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let mut resources = HashMap::new();
        resources.insert(
            "repos".to_string(),
            vec![resource(json!({"id": 1, "name": "r"})), resource(json!({"id": 2, "name": "s"}))],
        );
        store.save("github", "default", &resources, "github-rest-v3", true).unwrap();

        let (manifest, baseline) = store.load("github", "default").unwrap();
        assert_eq!(manifest.resource_counts["repos"], 2);
        assert_eq!(baseline["repos"].len(), 2);
        assert!(manifest.source_hash.unwrap().starts_with("sha256:"));
    }

    #[test]
    fn save_incremental_preserves_existing_on_id_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let mut first = HashMap::new();
        first.insert(
            "repos".to_string(),
            vec![resource(json!({"id": 1, "name": "old"})), resource(json!({"id": 2, "name": "keep"}))],
        );
        store.save("github", "default", &first, "c", true).unwrap();

        let mut second = HashMap::new();
        second.insert(
            "repos".to_string(),
            vec![resource(json!({"id": 1, "name": "new"})), resource(json!({"id": 3, "name": "add"}))],
        );
        store.save_incremental("github", "default", &second, "c", true).unwrap();

        let (manifest, baseline) = store.load("github", "default").unwrap();
        assert_eq!(manifest.resource_counts["repos"], 3);
        assert_eq!(baseline["repos"]["1"]["name"], json!("old"));
        assert_eq!(baseline["repos"]["2"]["name"], json!("keep"));
        assert_eq!(baseline["repos"]["3"]["name"], json!("add"));
    }

    #[test]
    fn save_incremental_without_prior_snapshot_behaves_like_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let mut resources = HashMap::new();
        resources.insert("repos".to_string(), vec![resource(json!({"id": 1}))]);
        let path = store.save_incremental("github", "default", &resources, "c", true).unwrap();
        assert!(path.join("manifest.json").exists());
    }

    #[test]
    fn load_missing_snapshot_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(matches!(
            store.load("github", "default"),
            Err(DoubleAgentError::SnapshotNotFound { .. })
        ));
    }

    #[test]
    fn delete_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let mut resources = HashMap::new();
        resources.insert("repos".to_string(), vec![resource(json!({"id": 1}))]);
        store.save("github", "default", &resources, "c", true).unwrap();

        assert!(store.delete("github", "default"));
        assert!(!store.delete("github", "default"));
    }

    #[test]
    fn list_scoped_to_one_service() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let mut resources = HashMap::new();
        resources.insert("repos".to_string(), vec![resource(json!({"id": 1}))]);
        store.save("github", "default", &resources, "c", true).unwrap();
        store.save("slack", "default", &resources, "c", true).unwrap();

        assert_eq!(store.list(Some("github")).len(), 1);
        assert_eq!(store.list(None).len(), 2);
    }
}
