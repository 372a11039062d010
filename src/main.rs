use tracing::info;

use tracklog::config::AppConfig;
use tracklog::{db, worker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting Tracklog Service...");

    // Init DB
    let pool = db::init_pool(&config.database_url).await?;
    info!("Connected to database");
    db::run_migrations(&pool).await?;

    // Start worker
    worker::start_import_worker(&config, pool).await?;

    Ok(())
}
