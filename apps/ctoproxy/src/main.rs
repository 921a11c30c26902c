use std::error::Error;

use clap::Parser;
use tracing::info;

mod chat;
mod cli;

use ctoproxy_common::GlobalConfig;
use ctoproxy_router::{GatewayState, gateway_router};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("ctoproxy failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let config = cli.global_config()?;
    info!(
        host = %config.host,
        port = config.port,
        cookies_file = %config.cookies_file,
        proxy = %config.proxy.as_deref().unwrap_or(""),
        default_adapter = %config.default_adapter,
        models = config.model_adapters.len(),
        "config loaded"
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Chat { adapter } => chat::run(&config, adapter).await,
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ctoproxy=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(config: &GlobalConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let state = GatewayState::from_global(config)?;
    let credentials = state.pool.reload().await;
    info!(credentials, cookies_file = %config.cookies_file, "pool ready");

    let app = gateway_router(state);
    let bind = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(addr = %bind, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;
    Ok(())
}
