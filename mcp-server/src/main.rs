use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use iteratr_core::Store;
use journal::JetStreamJournal;
use tracing::{error, info};

use mcp_server::config::Config;
use mcp_server::server::McpServer;
use mcp_server::telemetry::{init_telemetry, log_startup_info};

#[derive(Parser)]
#[command(name = "iteratr-mcp")]
#[command(about = "Iteratr MCP Tool Server - event-sourced session state over HTTP")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Start the HTTP MCP server
    #[arg(long)]
    start: bool,

    /// Session to serve (alphanumeric, plus '-' and '_')
    #[arg(long, env = "ITERATR_SESSION")]
    session: Option<String>,

    /// Port to listen on; 0 picks an ephemeral port
    #[arg(long, default_value = "0")]
    port: u16,

    /// Configuration file path
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<String>,

    /// NATS URL override for the journal broker
    #[arg(long, env = "NATS_URL")]
    nats_url: Option<String>,

    /// Listen address override (default: 127.0.0.1)
    #[arg(long, env = "LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// Log level override
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(config_file) => Config::from_file(config_file)?,
        None => Config::from_env()?,
    };

    if let Some(ref nats_url) = cli.nats_url {
        config.journal.url = nats_url.clone();
    }
    if let Some(ref listen_addr) = cli.listen_addr {
        config.server.listen_addr = listen_addr.clone();
    }
    if cli.port != 0 {
        config.server.port = cli.port;
    }
    if let Some(ref log_level) = cli.log_level {
        config.logging.level = log_level.clone();
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    if !cli.start {
        println!("Iteratr MCP Server");
        println!();
        println!("Usage:");
        println!("  iteratr-mcp --start --session=my-session [--port=8888]");
        println!();
        println!("This will:");
        println!("  - Connect to the JetStream journal (NATS_URL, default nats://127.0.0.1:4222)");
        println!("  - Serve the MCP tool endpoint at http://127.0.0.1:<port>/mcp");
        println!("  - Print the bound port once listening");
        println!();
        println!("For more options, use: iteratr-mcp --help");
        return Ok(());
    }

    let Some(session) = cli.session.clone() else {
        eprintln!("--session is required with --start");
        std::process::exit(1);
    };

    let config = load_config(&cli).context("Failed to load configuration")?;
    init_telemetry(&config.logging).context("Failed to initialize telemetry")?;

    if let Err(e) = config.validate() {
        error!(error = %e, "Configuration validation failed");
        std::process::exit(1);
    }
    log_startup_info(&config, &session);

    let journal = JetStreamJournal::connect(&config.journal.url)
        .await
        .context("Failed to connect to the journal broker")?;
    let store = Store::new(Arc::new(journal));

    let handle = McpServer::new(store, &session)
        .start(&config.server.listen_addr, config.server.port)
        .await
        .context("Failed to start MCP server")?;

    println!(
        "Iteratr MCP server ready at http://{}:{}/mcp (session: {})",
        config.server.listen_addr,
        handle.port(),
        session
    );
    println!("Press Ctrl+C to shutdown");

    wait_for_shutdown_signal().await;

    info!("Shutdown signal received, stopping server");
    handle.stop().await;
    println!("Iteratr MCP server shut down cleanly");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to register SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to register SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, initiating graceful shutdown");
            }
        }
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl+c");
        info!("Received Ctrl+C, initiating graceful shutdown");
    }
}
