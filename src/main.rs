//! mailgend - personalized email generation daemon

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use mailgen::{Config, Server};
use tracing::info;

/// Personalized marketing email generation daemon
#[derive(Parser, Debug)]
#[command(name = "mailgend", version, about = "Serve personalized email generation over HTTP")]
struct Args {
    /// TOML config file (defaults to ./mailgen.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    mailgen::init_tracing(&config.log);

    let server = Arc::new(Server::new(config)?);
    info!("Starting mailgend on {}", server.bind_addr());

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            signal_server.shutdown();
        }
    });

    server.run().await
}
