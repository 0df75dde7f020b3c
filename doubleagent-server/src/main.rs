//! Binary entry point for a single DoubleAgent fake service. Wires the
//! control plane (`/_doubleagent/*`) and the demonstration GitHub-shaped
//! vendor router onto one `axum::Router`, the way `ando-server` wires
//! `ando-admin` onto the proxy — except here there is only one HTTP
//! surface to bind, since DoubleAgent has no separate data-plane/admin-plane
//! split.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use clap::Parser;
use doubleagent_control::{idempotency_layer, ServiceState};
use doubleagent_core::config::RuntimeConfig;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "doubleagent-server", version, about = "A DoubleAgent fake service")]
struct Cli {
    /// Path to a YAML config file merged under `DOUBLEAGENT_` env overrides.
    #[arg(short, long)]
    config: Option<String>,

    /// Vendor-shaped service name exposed via `/_doubleagent/info`.
    #[arg(long, default_value = "github")]
    service: String,

    /// Log level, overridden by `RUST_LOG` if set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with_target(false)
        .init();

    let config = match RuntimeConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            std::process::exit(1);
        }
    };

    let port = std::env::var("PORT").ok().and_then(|v| v.parse::<u16>().ok()).unwrap_or(config.port);

    info!(service = %cli.service, port, "DoubleAgent fake starting");

    let state = ServiceState::new(&cli.service, config);

    let app = doubleagent_fakes::github::router(state.clone())
        .route_layer(from_fn_with_state(state.clone(), idempotency_layer))
        .merge(doubleagent_control::plane::router(state))
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "failed to bind listener");
            std::process::exit(1);
        }
    };

    info!(%addr, "DoubleAgent fake ready");

    let interrupted = Arc::new(AtomicBool::new(false));
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(interrupted.clone()))
        .await;

    match result {
        Ok(()) => {
            info!("DoubleAgent fake stopped");
            if interrupted.load(Ordering::SeqCst) {
                std::process::exit(130);
            }
            Ok(())
        }
        Err(err) => {
            tracing::error!(error = %err, "server error");
            std::process::exit(1);
        }
    }
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, flips `interrupted` so `main` can
/// exit `130`, the same convention the snapshot-pull CLI gets for free by
/// not installing a custom handler.
async fn shutdown_signal(interrupted: Arc<AtomicBool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
    interrupted.store(true, Ordering::SeqCst);
}
