use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Process-wide configuration, read once at startup and threaded explicitly
/// into every component constructor (no global state) per the design notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Listener port for the fake's HTTP surface.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Root directory for on-disk snapshots.
    #[serde(default = "default_snapshots_dir")]
    pub snapshots_dir: PathBuf,

    /// `DOUBLEAGENT_COMPLIANCE_MODE=strict` blocks all outbound connector HTTP.
    #[serde(default)]
    pub compliance_mode: ComplianceMode,

    /// `DOUBLEAGENT_DUAL_TARGET=1` enables the comparator collaborator.
    /// Out of core scope; the flag is threaded through so a collaborator
    /// built on top of this crate can observe it.
    #[serde(default)]
    pub dual_target: bool,

    /// Header name a client uses to make a POST idempotent.
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,

    #[serde(default)]
    pub webhooks: WebhookConfig,

    #[serde(default)]
    pub idempotency: IdempotencyConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceMode {
    #[default]
    Open,
    Strict,
}

impl ComplianceMode {
    pub fn is_strict(&self) -> bool {
        matches!(self, ComplianceMode::Strict)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_retry_delays")]
    pub retry_delays_secs: Vec<u64>,
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_max_log_entries")]
    pub max_log_entries: usize,
    /// Extra allowed hostnames, beyond the built-in loopback/private set.
    #[serde(default)]
    pub extra_allowed_hosts: Vec<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delays_secs: default_retry_delays(),
            attempt_timeout_secs: default_attempt_timeout(),
            worker_count: default_worker_count(),
            max_log_entries: default_max_log_entries(),
            extra_allowed_hosts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyConfig {
    /// Maximum cached entries before FIFO eviction kicks in. `None` = unbounded.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self { max_entries: None }
    }
}

impl RuntimeConfig {
    /// Load configuration from an optional YAML file, then apply
    /// `DOUBLEAGENT_`-prefixed environment overrides, following
    /// the teacher's `AndoConfig::load` composition.
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let mut figment = Figment::new();

        if let Some(path) = config_path {
            figment = figment.merge(Yaml::file(path));
        } else if std::path::Path::new("doubleagent.yaml").exists() {
            figment = figment.merge(Yaml::file("doubleagent.yaml"));
        }

        figment = figment.merge(Env::prefixed("DOUBLEAGENT_").split("__"));

        let config: Self = figment.extract()?;
        Ok(config)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            snapshots_dir: default_snapshots_dir(),
            compliance_mode: ComplianceMode::default(),
            dual_target: false,
            request_id_header: default_request_id_header(),
            webhooks: WebhookConfig::default(),
            idempotency: IdempotencyConfig::default(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_snapshots_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DOUBLEAGENT_SNAPSHOTS_DIR") {
        return PathBuf::from(dir);
    }
    dirs_home().join(".doubleagent").join("snapshots")
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_request_id_header() -> String {
    crate::DEFAULT_REQUEST_ID_HEADER.to_string()
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_delays() -> Vec<u64> {
    vec![1, 5, 30]
}

fn default_attempt_timeout() -> u64 {
    5
}

fn default_worker_count() -> usize {
    4
}

fn default_max_log_entries() -> usize {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_ports_and_retries() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.webhooks.max_retries, 3);
        assert_eq!(cfg.webhooks.retry_delays_secs, vec![1, 5, 30]);
        assert!(!cfg.compliance_mode.is_strict());
    }

    #[test]
    fn strict_compliance_mode_is_detected() {
        let mut cfg = RuntimeConfig::default();
        cfg.compliance_mode = ComplianceMode::Strict;
        assert!(cfg.compliance_mode.is_strict());
    }
}
