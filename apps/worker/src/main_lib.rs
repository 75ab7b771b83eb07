use std::sync::Arc;

use keyrelay_core::credentials::{CredentialRepositoryTrait, KeyPool, KeyPoolConfig};
use keyrelay_core::gateway::{OrchestratorConfig, RequestOrchestrator};
use keyrelay_core::recovery::RecoverySweeper;
use keyrelay_core::usage::UsageRecorder;
use keyrelay_core::utils::{Clock, SystemClock};
use keyrelay_market_data::provider::HttpTransport;
use keyrelay_market_data::{CircuitBreakerRegistry, ProviderRegistry};
use keyrelay_storage_sqlite::{db, CredentialRepository, UsageLogRepository};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{load_providers_file, Config, ProviderFileEntry};

pub struct AppState {
    pub providers: Arc<ProviderRegistry>,
    pub orchestrator: Arc<RequestOrchestrator>,
    pub sweeper: Arc<RecoverySweeper>,
    pub db_path: String,
}

pub fn init_tracing() {
    let log_format = std::env::var("KR_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // `init` also forwards `log` records from the library crates.
    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone());

    let credential_repository = Arc::new(CredentialRepository::new(pool.clone(), writer.clone()));
    let usage_repository = Arc::new(UsageLogRepository::new(pool.clone(), writer));

    let provider_entries = match &config.providers_file {
        Some(path) => load_providers_file(path)?,
        None => {
            tracing::warn!("KR_PROVIDERS_FILE not set; no providers registered");
            Vec::new()
        }
    };
    bootstrap_credentials(&credential_repository, &provider_entries).await?;

    let providers = Arc::new(ProviderRegistry::from_configs(
        provider_entries.into_iter().map(|entry| entry.config),
    ));
    let breakers = Arc::new(CircuitBreakerRegistry::new());
    providers.configure_breakers(&breakers);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let key_pool = Arc::new(
        KeyPool::new(
            credential_repository.clone(),
            KeyPoolConfig {
                cache_ttl_secs: config.selection_cache_ttl_secs,
                ..Default::default()
            },
            clock.clone(),
        )
        .with_usage_reader(usage_repository.clone()),
    );
    let recorder = Arc::new(UsageRecorder::new(
        credential_repository,
        usage_repository,
        key_pool.cache(),
        clock,
    ));
    let orchestrator = Arc::new(RequestOrchestrator::new(
        providers.clone(),
        key_pool.clone(),
        recorder,
        breakers,
        Arc::new(HttpTransport::new()?),
        OrchestratorConfig::default(),
    ));
    let sweeper = Arc::new(RecoverySweeper::new(key_pool.clone()));

    tracing::info!("Registered {} provider(s): {:?}", providers.len(), providers.names());

    Ok(Arc::new(AppState {
        providers,
        orchestrator,
        sweeper,
        db_path,
    }))
}

/// Inserts the credentials listed in the providers file that aren't stored yet.
///
/// Existing rows are left alone, so runtime state such as a rate-limited
/// status survives restarts.
async fn bootstrap_credentials(
    repository: &CredentialRepository,
    entries: &[ProviderFileEntry],
) -> anyhow::Result<usize> {
    let mut inserted = 0;
    for entry in entries {
        let provider = entry.config.name.as_str();
        for credential in &entry.credentials {
            if repository.find_by_name(provider, &credential.name)?.is_some() {
                continue;
            }
            let created = repository
                .create_credential(credential.clone().into_new_credential(provider))
                .await?;
            tracing::info!("Added key '{}' for {}", created.name, provider);
            inserted += 1;
        }
    }
    Ok(inserted)
}
