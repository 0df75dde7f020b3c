//! Out-of-core-scope CLI composing the in-scope pieces of the snapshot
//! pipeline: discover -> narrow by seeding config -> pull -> relational
//! filter -> redact -> save/save-incremental. Flags/UX here are not part
//! of the spec's tested surface; the composition they drive is.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use doubleagent_core::config::ComplianceMode;
use doubleagent_redact::{PiiRedactor, RedactionPolicy};
use doubleagent_snapshot::{apply_relational_filter, ConnectorRuntime, SeedingConfig, SnapshotStore, StreamSource};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "doubleagent-snapshot-pull", version, about = "Pull a redacted reference snapshot from a real API")]
struct Cli {
    /// Vendor service name, e.g. "github".
    #[arg(long)]
    service: String,

    /// Snapshot profile name, e.g. "default".
    #[arg(long, default_value = "default")]
    profile: String,

    /// Seeding configuration as a JSON string (see spec §6.3).
    #[arg(long)]
    seeding: Option<String>,

    /// Merge into an existing snapshot instead of overwriting it.
    #[arg(long, default_value_t = false)]
    incremental: bool,

    /// Skip PII redaction (NOT recommended outside local testing).
    #[arg(long, default_value_t = false)]
    no_redact: bool,

    /// Override the snapshot root directory.
    #[arg(long)]
    snapshots_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();

    let compliance_mode = if std::env::var("DOUBLEAGENT_COMPLIANCE_MODE").as_deref() == Ok("strict") {
        ComplianceMode::Strict
    } else {
        ComplianceMode::Open
    };

    if compliance_mode.is_strict() {
        tracing::error!("refusing to pull: DOUBLEAGENT_COMPLIANCE_MODE=strict blocks all connector HTTP");
        std::process::exit(1);
    }

    let Some(credentials) = std::env::var("DOUBLEAGENT_PULL_TOKEN").ok() else {
        tracing::error!("missing credentials: set DOUBLEAGENT_PULL_TOKEN");
        std::process::exit(1);
    };
    // The demonstration source below doesn't call out anywhere; a real
    // connector would thread `credentials` into its constructor here.
    let _ = credentials;

    let seeding: SeedingConfig = match &cli.seeding {
        Some(json) => match serde_json::from_str(json) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::error!(error = %err, "invalid --seeding JSON");
                std::process::exit(1);
            }
        },
        None => SeedingConfig::default(),
    };

    let source = DemoSource;
    let runtime = ConnectorRuntime::new(source);

    let streams: Vec<String> = seeding.all_stream_names().into_iter().collect();
    let pulled = match runtime.pull(&streams, &HashMap::new(), None).await {
        Ok(pulled) => pulled,
        Err(err) => {
            tracing::error!(error = %err, "pull failed");
            std::process::exit(1);
        }
    };

    let mut filtered = apply_relational_filter(&pulled, &seeding);

    if !cli.no_redact {
        let mut redactor = PiiRedactor::new(RedactionPolicy::new());
        for rows in filtered.values_mut() {
            redactor.redact_resources(rows);
        }
    }

    let snapshots_dir = cli
        .snapshots_dir
        .unwrap_or_else(|| doubleagent_core::config::RuntimeConfig::default().snapshots_dir);
    let store = SnapshotStore::new(snapshots_dir);

    let result = if cli.incremental {
        store.save_incremental(&cli.service, &cli.profile, &filtered, "demo-connector", !cli.no_redact)
    } else {
        store.save(&cli.service, &cli.profile, &filtered, "demo-connector", !cli.no_redact)
    };

    match result {
        Ok(dir) => tracing::info!(dir = %dir.display(), "snapshot written"),
        Err(err) => {
            tracing::error!(error = %err, "failed to write snapshot");
            std::process::exit(1);
        }
    }
}

/// Placeholder `StreamSource` standing in for a real vendor connector —
/// the snapshot-pull CLI's flag surface is out of core scope, but this
/// composition must exist and type-check against the real trait.
struct DemoSource;

#[async_trait::async_trait]
impl StreamSource for DemoSource {
    async fn discover(&self) -> anyhow::Result<Vec<doubleagent_snapshot::StreamInfo>> {
        Ok(vec![])
    }

    async fn select(&self, _streams: &[String]) -> anyhow::Result<()> {
        Ok(())
    }

    async fn read(&self, _stream: &str, _limit: Option<usize>) -> anyhow::Result<Vec<doubleagent_core::Resource>> {
        Ok(vec![])
    }
}
