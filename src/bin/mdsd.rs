use clap::Parser;

use rustfs::config::load_config;
use rustfs::mds_handlers::router;
use rustfs::mds_service::MdsState;

#[derive(Parser, Debug)]
#[command(name = "mdsd", version, about = "Runs the metadata service")]
struct Cli {
    #[arg(short, long)]
    port: Option<u16>,

    #[arg(short = 'd', long = "root_directory")]
    root_directory: Option<String>,

    #[arg(short = 'c', long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustfs::init_tracing();
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?.mds;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(root_directory) = cli.root_directory {
        config.root_directory = root_directory;
    }

    let state = MdsState::new(&config)?;
    state.start_liveness_checker();

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "mdsd listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install SIGINT handler");
    tracing::info!("mdsd shutting down");
}
