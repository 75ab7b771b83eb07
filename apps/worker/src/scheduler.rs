//! Background schedulers for the recovery sweep and the key health report.
//!
//! Both loops stop when the shutdown token is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::main_lib::AppState;

/// Starts the periodic recovery sweep. The first sweep runs immediately so
/// keys whose cool-down elapsed while the worker was down come back at once.
pub fn start_recovery_scheduler(
    state: Arc<AppState>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Recovery scheduler started ({}s interval)", every.as_secs());
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => run_recovery_sweep(&state).await,
            }
        }
        info!("Recovery scheduler stopped");
    })
}

async fn run_recovery_sweep(state: &AppState) {
    match state.sweeper.sweep_once().await {
        Ok(report) if report.failed.is_empty() => {
            debug!("Recovery sweep done: {} key(s) recovered", report.total_recovered());
        }
        Ok(report) => {
            warn!(
                "Recovery sweep done with failures for {:?}: {} key(s) recovered",
                report.failed,
                report.total_recovered()
            );
        }
        Err(e) => warn!("Recovery sweep failed: {}", e),
    }
}

/// Starts the periodic health report. The first tick is skipped; the
/// startup log already lists the registered providers.
pub fn start_health_report_scheduler(
    state: Arc<AppState>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => log_health_report(&state),
            }
        }
    })
}

fn log_health_report(state: &AppState) {
    for provider in state.providers.names() {
        match state.orchestrator.provider_health(&provider) {
            Ok(health) if health.keys.is_healthy() => info!(
                provider = %provider,
                circuit = ?health.circuit_state,
                active = health.keys.active,
                rate_limited = health.keys.rate_limited,
                disabled = health.keys.disabled,
                "Provider health"
            ),
            Ok(health) => warn!(
                provider = %provider,
                circuit = ?health.circuit_state,
                total = health.keys.total,
                rate_limited = health.keys.rate_limited,
                disabled = health.keys.disabled,
                "Provider has no active keys"
            ),
            Err(e) => warn!("Health report failed for {}: {}", provider, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::main_lib::build_state;

    #[tokio::test]
    async fn test_schedulers_stop_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            db_path: dir.path().join("keyrelay.db").to_string_lossy().to_string(),
            providers_file: None,
            sweep_interval: Duration::from_millis(10),
            health_report_interval: Duration::from_millis(10),
            selection_cache_ttl_secs: 0,
        };
        let state = build_state(&config).await.unwrap();
        let shutdown = CancellationToken::new();

        let recovery =
            start_recovery_scheduler(state.clone(), config.sweep_interval, shutdown.clone());
        let health =
            start_health_report_scheduler(state, config.health_report_interval, shutdown.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), async {
            recovery.await.unwrap();
            health.await.unwrap();
        })
        .await
        .unwrap();
    }
}
