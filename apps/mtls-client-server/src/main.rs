use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mtls_client_server::{AppConfig, AppState, api, build_secure_client, logging, signals};
use mtls_http::{DirResources, ResourceSource};

/// Client service calling an upstream server over mutual TLS
#[derive(Parser)]
#[command(name = "mtls-client-server")]
#[command(about = "Client service calling an upstream server over mutual TLS")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and certificate stores, then exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config
        && !path.is_file()
    {
        anyhow::bail!("config file does not exist: {}", path.display());
    }

    // defaults -> YAML (if provided) -> env (APP__*) -> CLI overrides
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(cli.port);

    logging::init(&config.logging, cli.verbose)?;

    if cli.print_config {
        println!("Effective configuration:\n{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

fn resources(config: &AppConfig) -> Arc<dyn ResourceSource> {
    Arc::new(DirResources::new(&config.client.resources_dir))
}

/// Loads both stores and composes the TLS context without calling upstream.
fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    build_secure_client(&config.client, resources(config).as_ref())
        .context("client certificate material is not usable")?;
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}

async fn run_server(config: AppConfig) -> Result<()> {
    let addr = config.server.bind_addr;
    let state = AppState::initialize(config.client.clone(), resources(&config));
    let router = api::router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, upstream = %config.client.url, "client service listening");

    let shutdown = async {
        if let Err(e) = signals::wait_for_shutdown().await {
            tracing::error!(error = %e, "signal handling failed, shutting down");
        }
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    tracing::info!("client service stopped");
    Ok(())
}
