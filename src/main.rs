#![forbid(unsafe_code)]

//! `agent-switchboard` — gateway server binary.
//!
//! Bootstraps configuration, the `SQLite` history store, the agent
//! dispatch loop, and the WebSocket hub.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use agent_switchboard::agents::echo::EchoAgent;
use agent_switchboard::config::GatewayConfig;
use agent_switchboard::core::gateway::Switchboard;
use agent_switchboard::hub::{self, ConnectionRegistry, HubNotifier, HubState};
use agent_switchboard::persistence::{db, store::SqliteHistoryStore};
use agent_switchboard::worker::AgentWorker;
use agent_switchboard::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "agent-switchboard", about = "Conversational agent gateway", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    ///
    /// Defaults to `config.toml` in the current working directory.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the HTTP port for the WebSocket hub.
    #[arg(long)]
    port: Option<u16>,

    /// Override the history database path.
    #[arg(long)]
    db: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("agent-switchboard server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let config_text = std::fs::read_to_string(&args.config).map_err(|err| {
        AppError::Config(format!(
            "cannot read config file '{}': {err} — pass --config <path> or create \
             config.toml next to the binary",
            args.config.display()
        ))
    })?;
    let mut config = GatewayConfig::from_toml_str(&config_text)?;

    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(db_path) = args.db {
        config.db_path = db_path.to_string_lossy().to_string();
    }
    info!("configuration loaded");

    // ── Initialize database ─────────────────────────────
    let database = Arc::new(db::open(&config.db_path).await?);
    let history = Arc::new(SqliteHistoryStore::new(database));
    info!("database connected");

    // ── Build the gateway core ──────────────────────────
    let connections = Arc::new(ConnectionRegistry::default());
    let notifier = Arc::new(HubNotifier::new(Arc::clone(&connections)));
    let (switchboard, prompts) = Switchboard::new(&config, history, notifier);

    let ct = CancellationToken::new();
    let worker = AgentWorker::new(Arc::clone(&switchboard), Arc::new(EchoAgent));
    let worker_handle = worker.spawn(prompts, ct.clone());
    let sweep_handle = Arc::clone(&switchboard).spawn_idle_sweep(ct.clone());
    info!("agent dispatch loop started");

    // ── Run the hub ─────────────────────────────────────
    let state = Arc::new(HubState {
        switchboard,
        connections,
        spaces: config.spaces.clone(),
        cancel: ct.clone(),
    });
    let hub_handle = tokio::spawn(hub::serve(config.http_port, state));

    tokio::signal::ctrl_c()
        .await
        .map_err(|err| AppError::Io(format!("failed to listen for shutdown signal: {err}")))?;
    info!("shutdown signal received");
    ct.cancel();

    let _ = hub_handle.await;
    let _ = worker_handle.await;
    if let Some(handle) = sweep_handle {
        let _ = handle.await;
    }
    info!("agent-switchboard stopped");
    Ok(())
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
