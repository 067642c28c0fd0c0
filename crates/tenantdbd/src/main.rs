//! tenantdbd — the tenantdb service-broker daemon.
//!
//! Single binary that assembles the broker:
//! - State store (redb)
//! - Cluster control plane (REST, or in-process for local runs)
//! - Instance and binding managers behind the dispatcher
//! - Service-broker REST API
//!
//! # Usage
//!
//! ```text
//! tenantdbd serve --config /etc/tenantdb/broker.toml
//! tenantdbd check-config --config /etc/tenantdb/broker.toml
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use tenantdb_core::config::template_from_connection_uri;
use tenantdb_core::{BrokerConfig, ClusterConfig, ControlPlaneKind};
use tenantdb_lifecycle::{Broker, ControlPlane, HttpControlPlane, InMemoryControlPlane};
use tenantdb_state::StateStore;

#[derive(Parser)]
#[command(name = "tenantdbd", about = "tenantdb service broker")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run the broker API server.
    Serve {
        /// Path to broker.toml.
        #[arg(long, default_value = "broker.toml")]
        config: PathBuf,

        /// Override `server.listen`.
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
    /// Parse and validate a config file, then exit.
    CheckConfig {
        #[arg(long, default_value = "broker.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Serve { config, listen } => run_serve(&config, listen).await,
        Command::CheckConfig { config } => check_config(&config),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tenantdb=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn check_config(path: &Path) -> anyhow::Result<()> {
    let config = BrokerConfig::from_file(path)?;
    println!("config ok: {}", path.display());
    println!("  listen:        {}", config.server.listen);
    println!("  store:         {}", config.store.path.display());
    println!("  control plane: {:?}", config.control_plane.kind);
    for name in config.clusters.keys() {
        println!("  cluster:       {name}");
    }
    Ok(())
}

async fn run_serve(config_path: &Path, listen: Option<SocketAddr>) -> anyhow::Result<()> {
    info!(config = %config_path.display(), "tenantdb broker starting");

    let mut config = BrokerConfig::from_file(config_path)?;

    // ── Initialize subsystems ──────────────────────────────────

    // State store.
    if let Some(parent) = config.store.path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = StateStore::open(&config.store.path)?;
    info!(path = ?config.store.path, "state store opened");

    // Control plane.
    let control_plane = build_control_plane(&mut config).await?;
    if config.clusters.is_empty() {
        warn!("no cluster templates configured; every bind will fail");
    }

    let addr: SocketAddr = match listen {
        Some(addr) => addr,
        None => config.server.listen.parse()?,
    };

    let broker = Arc::new(Broker::new(config, store, control_plane));
    info!("broker initialized");

    // ── Start API server ───────────────────────────────────────

    let router = tenantdb_api::build_router(broker);

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("tenantdb broker stopped");
    Ok(())
}

/// Select the control plane named by the config. With the REST control
/// plane and no `[clusters]` table, templates are discovered from the
/// clusters' advertised connection strings.
async fn build_control_plane(config: &mut BrokerConfig) -> anyhow::Result<Arc<dyn ControlPlane>> {
    match config.control_plane.kind {
        ControlPlaneKind::Memory => {
            let clusters = config.control_plane.existing_clusters.clone();
            info!(clusters = clusters.len(), "in-memory control plane");
            Ok(Arc::new(InMemoryControlPlane::with_clusters(clusters)))
        }
        ControlPlaneKind::Http => {
            let cp = HttpControlPlane::new(&config.control_plane)?;
            if config.clusters.is_empty() {
                for cluster in cp.list_clusters().await? {
                    let Some(uri) = cluster.connection_uri else {
                        warn!(cluster = %cluster.name, "cluster has no connection string");
                        continue;
                    };
                    let template = template_from_connection_uri(&uri);
                    info!(cluster = %cluster.name, "discovered cluster template");
                    config
                        .clusters
                        .insert(cluster.name, ClusterConfig::new(template));
                }
                config.validate()?;
            }
            info!(base_url = %config.control_plane.base_url, "REST control plane");
            Ok(Arc::new(cp))
        }
    }
}
