mod config;
mod protocol;
mod server;
mod service;

use std::sync::Arc;

use anyhow::Result;
use config::DaemonConfig;
use override_engine::SystemClock;
use server::OverrideServer;
use service::OverrideService;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = DaemonConfig::load()?;
    info!(
        socket = %config.server.socket_path.display(),
        capacity = config.model.capacity,
        halflife = config.model.halflife,
        ranking = ?config.ranking,
        "loaded override daemon config"
    );
    let service = OverrideService::new(config.model, config.ranking, Arc::new(SystemClock))?;
    let server = OverrideServer::new(config.server.clone(), service);
    server.run().await
}
