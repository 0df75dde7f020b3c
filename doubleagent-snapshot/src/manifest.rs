use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata written alongside a pulled snapshot's per-resource-type files.
///
/// Every field is `#[serde(default)]` so a manifest written by an older
/// (or newer) version of this crate still loads — unknown fields are
/// ignored by `serde_json` by default, missing ones fall back here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotManifest {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub profile: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub pulled_at: f64,
    #[serde(default)]
    pub connector: String,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default)]
    pub resource_counts: HashMap<String, usize>,
    #[serde(default)]
    pub source_hash: Option<String>,
}

fn default_version() -> u32 {
    1
}

impl SnapshotManifest {
    pub fn new(service: &str, profile: &str, connector: &str, redacted: bool, pulled_at: f64) -> Self {
        Self {
            service: service.to_string(),
            profile: profile.to_string(),
            version: 1,
            pulled_at,
            connector: connector.to_string(),
            redacted,
            resource_counts: HashMap::new(),
            source_hash: None,
        }
    }
}
