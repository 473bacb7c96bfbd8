//! provenance-kernel: HTTP server for creative-work provenance.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use provenance_kernel::core::Keypair;
use provenance_kernel::log::{MemoryLog, SqliteLog};
use provenance_kernel::{Kernel, KernelConfig, ServiceIdentity};
use provenance_kernel_server::{router, AppState, SharedLog};

/// Provenance kernel HTTP server
#[derive(Parser, Debug)]
#[command(name = "provenance-kernel")]
#[command(version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "PROVENANCE_LISTEN", default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Path to the SQLite log; an in-memory log is used when absent
    #[arg(long, env = "PROVENANCE_DB")]
    db: Option<PathBuf>,

    /// Network name embedded in every DID
    #[arg(long, env = "PROVENANCE_NETWORK", default_value = "testnet")]
    network: String,

    /// Platform name of the sentinel identity
    #[arg(long, env = "PROVENANCE_PLATFORM", default_value = "ProvenanceStudio")]
    platform: String,

    /// Issuer signing key seed (32 bytes hex); random when absent
    #[arg(long, env = "PROVENANCE_ISSUER_SEED", hide_env_values = true)]
    issuer_seed: Option<String>,

    /// Sentinel signing key seed (32 bytes hex); no co-signing when absent
    #[arg(long, env = "PROVENANCE_SENTINEL_SEED", hide_env_values = true)]
    sentinel_seed: Option<String>,

    /// File the published sentinel identity is remembered in
    #[arg(long, env = "PROVENANCE_SENTINEL_STATE")]
    sentinel_state: Option<PathBuf>,

    /// Directory track files are resolved against
    #[arg(long, env = "PROVENANCE_ARTIFACT_ROOT", default_value = ".")]
    artifact_root: PathBuf,

    /// Pause between fragments of one document, in milliseconds
    #[arg(long, env = "PROVENANCE_APPEND_INTERVAL_MS", default_value = "500")]
    append_interval_ms: u64,

    /// Per-call log timeout, in seconds
    #[arg(long, env = "PROVENANCE_TIMEOUT_SECS", default_value = "30")]
    timeout_secs: u64,

    /// Attempts per log call before giving up
    #[arg(long, env = "PROVENANCE_RETRY_ATTEMPTS", default_value = "3")]
    retry_attempts: u32,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "PROVENANCE_LOG", default_value = "info")]
    log_level: String,
}

impl Args {
    fn kernel_config(&self) -> KernelConfig {
        let mut config = KernelConfig {
            network: self.network.clone(),
            platform_name: self.platform.clone(),
            append_interval: Duration::from_millis(self.append_interval_ms),
            operation_timeout: Duration::from_secs(self.timeout_secs),
            artifact_root: self.artifact_root.clone(),
            sentinel_state_path: self.sentinel_state.clone(),
            ..KernelConfig::default()
        };
        config.retry.max_attempts = self.retry_attempts;
        config
    }

    fn service_identity(&self) -> Result<ServiceIdentity> {
        let issuer = match &self.issuer_seed {
            Some(seed) => Keypair::from_seed_hex(seed).context("invalid --issuer-seed")?,
            None => {
                warn!("no issuer seed configured, using an ephemeral key");
                Keypair::generate()
            }
        };
        let mut identity = ServiceIdentity::new(issuer);
        if let Some(seed) = &self.sentinel_seed {
            identity = identity
                .with_sentinel(Keypair::from_seed_hex(seed).context("invalid --sentinel-seed")?);
        }
        Ok(identity)
    }

    fn open_log(&self) -> Result<SharedLog> {
        Ok(match &self.db {
            Some(path) => {
                info!(path = %path.display(), "opening SQLite log");
                Arc::new(SqliteLog::open(path).context("failed to open log database")?)
            }
            None => {
                warn!("no --db given, messages are kept in memory only");
                Arc::new(MemoryLog::new())
            }
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let identity = args.service_identity()?;
    let log = args.open_log()?;
    let kernel = Kernel::start(identity, log, args.kernel_config()).await;
    match kernel.sentinel() {
        Some(sentinel) => info!(did = %sentinel.did, "sentinel ready"),
        None => warn!("running without sentinel attestation"),
    }

    let app = router(AppState::new(kernel));
    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!(addr = %args.listen, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
