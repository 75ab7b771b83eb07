mod config;
mod main_lib;
mod scheduler;

use config::Config;
use main_lib::{build_state, init_tracing};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();
    init_tracing();
    let config = Config::from_env()?;
    let state = build_state(&config).await?;

    let shutdown = CancellationToken::new();
    let recovery = scheduler::start_recovery_scheduler(
        state.clone(),
        config.sweep_interval,
        shutdown.clone(),
    );
    let health = scheduler::start_health_report_scheduler(
        state.clone(),
        config.health_report_interval,
        shutdown.clone(),
    );

    tracing::info!("keyrelay worker running on {}", state.db_path);
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    shutdown.cancel();
    let _ = tokio::join!(recovery, health);
    Ok(())
}
