//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use anyhow::Context;
use dotenv::dotenv;
use seller_console::adapters::clock::SystemClock;
use seller_console::adapters::fixtures::FixtureLeadSource;
use seller_console::adapters::persistence::{JsonKvStore, MemoryKvStore, SqliteKvStore};
use seller_console::adapters::remote::SimulatedRemote;
use seller_console::adapters::ui::tui::TuiInputPort;
use seller_console::domain::DomainStore;
use seller_console::ports::{InputPort, KeyValueStore, LeadSource, RemoteGateway};
use seller_console::shared::config::{AppConfig, PrefsBackend};
use seller_console::usecases::{ConsoleService, OptimisticMutator, PreferenceService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found"),
    }

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "invalid configuration, using defaults");
        AppConfig::default()
    });
    let data_dir = PathBuf::from(cfg.data_dir_or_default());

    // --- Preferences backend ---
    let prefs: Arc<dyn KeyValueStore> = match cfg.prefs_backend_or_default() {
        PrefsBackend::Json => {
            let store = JsonKvStore::new(data_dir.join("preferences.json"));
            store
                .load()
                .await
                .context("failed to load preferences file")?;
            Arc::new(store)
        }
        PrefsBackend::Sqlite => Arc::new(
            SqliteKvStore::connect(&data_dir)
                .await
                .context("failed to open preference database")?,
        ),
        PrefsBackend::Memory => Arc::new(MemoryKvStore::new()),
    };
    info!(
        backend = ?cfg.prefs_backend_or_default(),
        data_dir = %data_dir.display(),
        "preferences ready"
    );

    // --- Simulated backend ---
    let remote: Arc<dyn RemoteGateway> = Arc::new(SimulatedRemote::from_config(&cfg));
    let leads: Arc<dyn LeadSource> = Arc::new(FixtureLeadSource::from_config(&cfg));

    // --- Services ---
    let store = Arc::new(DomainStore::new());
    let mutator = Arc::new(
        OptimisticMutator::new(Arc::clone(&store), remote, Arc::new(SystemClock))
            .with_in_flight_guard(cfg.guard_in_flight_or_default()),
    );
    let console = Arc::new(ConsoleService::new(
        store,
        mutator,
        PreferenceService::new(prefs),
        leads,
    ));

    seller_console::adapters::ui::init_ui();

    let tui = TuiInputPort::new(console);
    tui.run().await.context("console session failed")?;
    Ok(())
}
