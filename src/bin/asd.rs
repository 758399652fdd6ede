use std::sync::Arc;

use clap::Parser;

use rustfs::as_handlers::router;
use rustfs::as_service::AsState;
use rustfs::config::load_config;

#[derive(Parser, Debug)]
#[command(name = "asd", version, about = "Runs the stateless access service")]
struct Cli {
    #[arg(short, long)]
    port: Option<u16>,

    #[arg(short = 'm', long = "metaserver")]
    meta_server_address: Option<String>,

    #[arg(short = 'c', long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustfs::init_tracing();
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?.access;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(meta_server_address) = cli.meta_server_address {
        config.meta_server_address = meta_server_address;
    }

    let state = Arc::new(AsState::new(&config));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "asd listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install SIGINT handler");
    tracing::info!("asd shutting down");
}
