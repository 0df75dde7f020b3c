use std::collections::HashMap;

use async_trait::async_trait;
use doubleagent_core::Resource;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Reserved field-name prefixes a connector's internal plumbing may use;
/// stripped by [`ConnectorRuntime::pull`] before records ever reach the
/// relational filter or redactor.
const RESERVED_PREFIXES: &[&str] = &["_ab_", "_da_"];

/// Describes one resource type a [`StreamSource`] can pull, matching the
/// richer `ResourceSchema` the original connector interface exposed
/// (field list, incremental support, description) rather than a bare name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamInfo {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub supports_incremental: bool,
    #[serde(default)]
    pub description: String,
}

/// Pluggable source of raw, unredacted records, consumed (not implemented)
/// by this crate — a connector adapter lives per vendor integration.
#[async_trait]
pub trait StreamSource: Send + Sync {
    async fn discover(&self) -> anyhow::Result<Vec<StreamInfo>>;

    /// Idempotent: tells the source which streams the caller intends to
    /// read, before any `read` call.
    async fn select(&self, streams: &[String]) -> anyhow::Result<()>;

    async fn read(&self, stream: &str, limit: Option<usize>) -> anyhow::Result<Vec<Resource>>;
}

/// Drives a [`StreamSource`]: discovers streams, pulls each requested one,
/// and strips reserved internal metadata fields. Per-stream pull failures
/// are logged and do not abort the rest of the pull (per `spec.md` §7's
/// "absorb connector errors, log-and-continue" propagation policy).
pub struct ConnectorRuntime<S: StreamSource> {
    source: S,
}

impl<S: StreamSource> ConnectorRuntime<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub async fn discover(&self) -> anyhow::Result<Vec<StreamInfo>> {
        self.source.discover().await
    }

    pub async fn pull(
        &self,
        streams: &[String],
        per_stream_limits: &HashMap<String, usize>,
        global_limit: Option<usize>,
    ) -> anyhow::Result<HashMap<String, Vec<Resource>>> {
        self.source.select(streams).await?;

        let mut out = HashMap::new();
        for stream in streams {
            let limit = per_stream_limits.get(stream).copied().or(global_limit);
            match self.source.read(stream, limit).await {
                Ok(records) => {
                    let cleaned = records.into_iter().map(strip_reserved_fields).collect();
                    out.insert(stream.clone(), cleaned);
                }
                Err(err) => {
                    warn!(stream = %stream, error = %err, "connector pull failed for stream, continuing");
                }
            }
        }
        Ok(out)
    }
}

fn strip_reserved_fields(mut resource: Resource) -> Resource {
    let reserved: Vec<String> = resource
        .keys()
        .filter(|k| RESERVED_PREFIXES.iter().any(|p| k.starts_with(p)))
        .cloned()
        .collect();
    for key in reserved {
        resource.remove(&key);
    }
    resource
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeSource {
        data: HashMap<String, Vec<Resource>>,
        selected: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StreamSource for FakeSource {
        async fn discover(&self) -> anyhow::Result<Vec<StreamInfo>> {
            Ok(self
                .data
                .keys()
                .map(|name| StreamInfo {
                    name: name.clone(),
                    fields: vec![],
                    supports_incremental: false,
                    description: String::new(),
                })
                .collect())
        }

        async fn select(&self, streams: &[String]) -> anyhow::Result<()> {
            *self.selected.lock().unwrap() = streams.to_vec();
            Ok(())
        }

        async fn read(&self, stream: &str, limit: Option<usize>) -> anyhow::Result<Vec<Resource>> {
            if stream == "broken" {
                anyhow::bail!("simulated upstream failure");
            }
            let rows = self.data.get(stream).cloned().unwrap_or_default();
            Ok(match limit {
                Some(n) => rows.into_iter().take(n).collect(),
                None => rows,
            })
        }
    }

    #[tokio::test]
    async fn pull_strips_reserved_prefixed_fields() {
        let mut data = HashMap::new();
        data.insert(
            "repos".to_string(),
            vec![json!({"id": 1, "_ab_sync_id": "x", "_da_internal": "y", "name": "r"})
                .as_object()
                .unwrap()
                .clone()],
        );
        let source = FakeSource {
            data,
            selected: Mutex::new(vec![]),
        };
        let runtime = ConnectorRuntime::new(source);
        let result = runtime
            .pull(&["repos".to_string()], &HashMap::new(), None)
            .await
            .unwrap();

        let repo = &result["repos"][0];
        assert!(!repo.contains_key("_ab_sync_id"));
        assert!(!repo.contains_key("_da_internal"));
        assert_eq!(repo["name"], json!("r"));
    }

    #[tokio::test]
    async fn per_stream_failure_is_absorbed_and_others_proceed() {
        let mut data = HashMap::new();
        data.insert("repos".to_string(), vec![json!({"id": 1}).as_object().unwrap().clone()]);
        let source = FakeSource {
            data,
            selected: Mutex::new(vec![]),
        };
        let runtime = ConnectorRuntime::new(source);
        let result = runtime
            .pull(&["repos".to_string(), "broken".to_string()], &HashMap::new(), None)
            .await
            .unwrap();

        assert!(result.contains_key("repos"));
        assert!(!result.contains_key("broken"));
    }

    #[tokio::test]
    async fn global_and_per_stream_limits_apply() {
        let mut data = HashMap::new();
        data.insert(
            "repos".to_string(),
            (0..5).map(|i| json!({"id": i}).as_object().unwrap().clone()).collect(),
        );
        let source = FakeSource {
            data,
            selected: Mutex::new(vec![]),
        };
        let runtime = ConnectorRuntime::new(source);
        let mut per_stream = HashMap::new();
        per_stream.insert("repos".to_string(), 2);
        let result = runtime.pull(&["repos".to_string()], &per_stream, Some(10)).await.unwrap();
        assert_eq!(result["repos"].len(), 2);
    }
}
