use clap::Parser;

use rustfs::config::load_config;
use rustfs::cs_handlers::router;
use rustfs::cs_service::CsState;

#[derive(Parser, Debug)]
#[command(name = "csd", version, about = "Runs a chunk storage service")]
struct Cli {
    #[arg(short, long)]
    port: Option<u16>,

    #[arg(short = 'd', long = "root_directory")]
    root_directory: Option<String>,

    #[arg(short = 'm', long = "metaserver")]
    meta_server_address: Option<String>,

    #[arg(short = 'c', long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustfs::init_tracing();
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?.cs;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(root_directory) = cli.root_directory {
        config.root_directory = root_directory;
    }
    if let Some(meta_server_address) = cli.meta_server_address {
        config.meta_server_address = meta_server_address;
    }

    let node_name = hostname::get()?.to_string_lossy().into_owned();
    let server_id = format!("{node_name}:{}", config.port);
    let state = std::sync::Arc::new(CsState::new(server_id, &config)?);
    state.clone().start_heartbeat_worker();

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "csd listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install SIGINT handler");
    tracing::info!("csd shutting down");
}
