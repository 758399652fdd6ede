pub mod as_handlers;
pub mod as_service;
pub mod config;
pub mod cs_handlers;
pub mod cs_service;
pub mod dto;
pub mod error;
pub mod mds_handlers;
pub mod mds_service;
pub mod util;

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
