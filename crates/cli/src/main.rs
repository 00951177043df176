//! bserctl
//!
//! Command-line client for a file-watching daemon that speaks BSER over a
//! Unix domain socket.

mod cli;
mod config;
mod rank;

use bserlink_client::{Client, Connection};
use clap::Parser;
use cli::{Cli, Command};
use color_eyre::eyre::{Result, WrapErr, bail};
use config::Config;
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_deref())?
        .with_socket(cli.socket.clone())
        .with_log_level(cli.log_level.clone());

    init_logging(&config.client.log_level)?;

    match cli.command {
        Command::WatchProject { root } => cmd_watch_project(&config, &root),
        Command::Query {
            root,
            relative_root,
            limit,
        } => cmd_query(&config, &root, relative_root.as_deref(), limit),
        Command::Ping => cmd_ping(&config),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();

    Ok(())
}

fn connect(config: &Config) -> Result<Client> {
    let Some(socket) = config.client.socket.as_ref() else {
        bail!("No daemon socket configured (use --socket or set client.socket)");
    };

    let connection = Connection::connect(socket)
        .wrap_err_with(|| format!("Failed to reach daemon at {}", socket.display()))?
        .with_max_pdu_size(config.client.max_pdu_size);

    tracing::info!(socket = %socket.display(), "Connected");
    Ok(Client::new(connection))
}

fn cmd_watch_project(config: &Config, root: &Path) -> Result<()> {
    let mut client = connect(config)?;

    let result = client
        .watch_project(root)
        .wrap_err_with(|| format!("watch-project failed for {}", root.display()))?;

    println!("{}", result.watch.display());
    if let Some(relative) = &result.relative_path {
        println!("{}", relative.display());
    }

    client.disconnect()?;
    Ok(())
}

fn cmd_query(
    config: &Config,
    root: &Path,
    relative_root: Option<&Path>,
    limit: Option<usize>,
) -> Result<()> {
    let mut client = connect(config)?;

    let result = client
        .query(root, relative_root)
        .wrap_err_with(|| format!("query failed for {}", root.display()))?;

    if let Some(clock) = &result.clock {
        tracing::info!(clock = %clock, files = result.files.len(), "Query result");
    }

    for file in rank::first_sorted(result.files, limit) {
        println!("{}", file.display());
    }

    client.disconnect()?;
    Ok(())
}

fn cmd_ping(config: &Config) -> Result<()> {
    let mut client = connect(config)?;

    let response = client.version().wrap_err("version request failed")?;
    match response.get("version").and_then(|v| v.as_str()) {
        Some(version) => println!("Daemon version {version}"),
        None => println!("Unexpected response: {response:?}"),
    }

    client.disconnect()?;
    Ok(())
}
