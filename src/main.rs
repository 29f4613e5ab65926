//! status-beacon server binary.

use status_beacon::{Config, Server, StatusTable};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        workers = config.workers,
        seeded = config.statuses.len(),
        "Starting status-beacon server"
    );

    let table = StatusTable::from_entries(config.statuses.clone());
    let server = Server::bind(&config, table)?;
    server.run().await?;
    Ok(())
}
