#![forbid(unsafe_code)]

//! `agent-switchboard-ask` — one-shot CLI transport.
//!
//! Builds the gateway core in-process, sends a single prompt, and prints
//! the streamed response. Exit code 0 on success, nonzero on an
//! unrecoverable error (invalid agent, agent failure).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use agent_switchboard::agents::echo::EchoAgent;
use agent_switchboard::config::{AgentEntry, GatewayConfig, StreamConfig, TimeoutConfig};
use agent_switchboard::core::gateway::Switchboard;
use agent_switchboard::core::notify::NullNotifier;
use agent_switchboard::persistence::{db, store::SqliteHistoryStore};
use agent_switchboard::worker::AgentWorker;
use agent_switchboard::{AppError, Result};

/// Topic id used for the single in-process conversation.
const CLI_TOPIC: &str = "cli";
/// Chat id used for the single in-process conversation.
const CLI_CHAT: i64 = 1;

#[derive(Debug, Parser)]
#[command(name = "agent-switchboard-ask", about = "Send one prompt through the gateway", version, long_about = None)]
struct Cli {
    /// Prompt to send.
    prompt: String,

    /// Agent to dispatch to; defaults to the first configured agent.
    #[arg(long)]
    agent: Option<String>,

    /// Print reasoning frames to stderr as they stream.
    #[arg(long)]
    show_reasoning: bool,

    /// Optional TOML configuration; built-in defaults otherwise.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();

    let outcome = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))
        .and_then(|runtime| runtime.block_on(run(args)));

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn builtin_config() -> GatewayConfig {
    GatewayConfig {
        http_port: 0,
        db_path: String::new(),
        agents: vec![AgentEntry {
            id: "echo".to_owned(),
            name: "Echo".to_owned(),
            description: "Echoes prompts back".to_owned(),
        }],
        spaces: Vec::new(),
        stream: StreamConfig::default(),
        timeouts: TimeoutConfig::default(),
    }
}

async fn run(args: Cli) -> Result<()> {
    let config = match &args.config {
        Some(path) => GatewayConfig::load_from_path(path)?,
        None => builtin_config(),
    };

    let agent_id = match args.agent {
        Some(agent) => agent,
        None => config
            .agents
            .first()
            .map(|agent| agent.id.clone())
            .ok_or_else(|| AppError::Config("no agents configured".into()))?,
    };

    let database = Arc::new(db::open_in_memory().await?);
    let history = Arc::new(SqliteHistoryStore::new(database));
    let (switchboard, prompts) = Switchboard::new(&config, history, Arc::new(NullNotifier));

    let ct = CancellationToken::new();
    let worker = AgentWorker::new(Arc::clone(&switchboard), Arc::new(EchoAgent));
    let worker_handle = worker.spawn(prompts, ct.clone());

    if !switchboard.start_session(CLI_TOPIC, &agent_id, CLI_CHAT, 0, None) {
        ct.cancel();
        let _ = worker_handle.await;
        return Err(AppError::UnknownAgent(agent_id));
    }

    let mut subscription =
        switchboard.send_message(CLI_TOPIC, &args.prompt, "cli-user", None, ct.child_token())?;

    let mut failure = None;
    while let Some(frame) = subscription.next().await {
        if args.show_reasoning {
            if let Some(reasoning) = &frame.reasoning {
                eprintln!("· {reasoning}");
            }
        }
        if let Some(content) = &frame.content {
            println!("{content}");
        }
        if let Some(error) = frame.error {
            failure = Some(AppError::Agent(error));
        }
        if frame.is_complete {
            break;
        }
    }
    drop(subscription);

    ct.cancel();
    let _ = worker_handle.await;
    failure.map_or(Ok(()), Err)
}
