mod cli;
mod commands;
mod config;
mod storage;
mod tui;

use std::io;

use crate::cli::{Command, ConfigCommand};
use clap::Parser;
use color_eyre::Result;
use sealbox_core::{
    adapter::ExecutionStrategy, keyed_store::SecureKeyedStore, storage::SecureBackend,
};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Namespace reserved for the health probe so it never collides with user data.
const HEALTH_NAMESPACE: &str = "__sealbox_health__";

/// Entry point wiring the CLI to the keyed store and the TUI.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    let namespace = cli
        .namespace
        .or_else(|| config.namespace.clone())
        .unwrap_or_else(|| storage::DEFAULT_NAMESPACE.to_string());

    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => {
            let store = storage::store_from_config(&config, &namespace)?;
            let rows = tui::load_rows(&store).await?;
            tui::launch(&namespace, &rows)?
        }
        Command::Version => print_version(),
        Command::Health => run_health_check(&config).await?,
        Command::Config(ConfigCommand::Init) => init_config(&config)?,
        Command::Store(cmd) => {
            let store = storage::store_from_config(&config, &namespace)?;
            commands::handle(cmd, &store, &mut io::stdout()).await?
        }
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info to avoid noisy stdout.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("sealbox {}", env!("CARGO_PKG_VERSION"));
}

/// Runs a quick health check of the configured backend.
async fn run_health_check(config: &config::Config) -> Result<()> {
    let backend = storage::backend_from_config(config)?;
    let store = storage::open_store(backend, HEALTH_NAMESPACE, config.execution)?;
    run_store_health(&store).await?;
    println!("Storage ({:?}): ok", config.backend);
    Ok(())
}

async fn run_store_health<B, E>(store: &SecureKeyedStore<Value, B, E>) -> Result<()>
where
    B: SecureBackend,
    E: ExecutionStrategy,
{
    let probe_key = "probe";
    let payload = json!({ "status": "ok", "note": "colons:survive" });
    store.put(probe_key, payload.clone()).await?;
    let round_trip = store.get(probe_key).await?;
    store.remove(probe_key).await?;

    match round_trip {
        Some(entry) if entry.value == payload => Ok(()),
        Some(_) => color_eyre::eyre::bail!("storage round-trip returned a different value"),
        None => color_eyre::eyre::bail!("storage round-trip lost the probe entry"),
    }
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
