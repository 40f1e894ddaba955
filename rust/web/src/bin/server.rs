//! Standalone blackjack server
//!
//! Usage: cargo run -p blackjack_web --bin blackjack-server -- --config blackjack-config.toml

use blackjack_web::{BlackjackConfig, ServerConfig, WebServer};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "blackjack-server", version, about = "Blackjack session server")]
struct Args {
    /// TOML configuration file (falls back to $BLACKJACK_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Host to bind to, overriding the file
    #[arg(long)]
    host: Option<String>,
    /// Port to bind to, overriding the file
    #[arg(short, long)]
    port: Option<u16>,
    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    blackjack_web::init_logging(args.log_json)?;

    let mut config = match &args.config {
        Some(path) => BlackjackConfig::load(path)?,
        None => BlackjackConfig::load_from_env()?,
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        initial_bank = config.game.initial_bank,
        max_history_entries = config.game.max_history_entries,
        session_timeout_minutes = config.game.session_timeout_minutes,
        "starting blackjack server"
    );

    let server = WebServer::new(ServerConfig::from_config(&config))?;
    let handle = server.start().await?;
    println!("Server running at http://{}", handle.address());
    println!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down server");
    handle.shutdown().await?;
    Ok(())
}
