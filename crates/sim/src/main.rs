use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use jobcraft_infra::{
    EngineConfig, InMemoryEconomy, InMemoryStorage, JobsEngine, JsonFileStorage, StaticConfig,
    Storage, TracingNotifier,
};
use jobcraft_sim::{demo_catalog, run_simulation, SimulationSettings};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment value");
            default
        }),
        Err(_) => default,
    }
}

fn main() -> anyhow::Result<()> {
    jobcraft_observability::init();

    let catalog = demo_catalog().context("built-in job catalog is invalid")?;

    // Short real-time intervals so a simulated session sees several ticks.
    let config = EngineConfig::from_env().with_intervals(
        Duration::from_millis(env_or("JOBCRAFT_SIM_SAVE_MS", 250)),
        Duration::from_millis(env_or("JOBCRAFT_SIM_PAYOUT_MS", 50)),
    );

    let storage: Arc<dyn Storage> = match std::env::var("JOBCRAFT_DATA_FILE") {
        Ok(path) => {
            let file = JsonFileStorage::open(&path)
                .with_context(|| format!("opening data file {path}"))?;
            tracing::info!(path = %file.path().display(), "progression persisted to json file");
            Arc::new(file)
        }
        Err(_) => {
            tracing::warn!("JOBCRAFT_DATA_FILE not set; progression is kept in memory only");
            Arc::new(InMemoryStorage::new())
        }
    };
    let economy = Arc::new(InMemoryEconomy::new());

    let engine = JobsEngine::new(
        Arc::new(StaticConfig::new(config, catalog)),
        storage,
        economy.clone(),
    )
    .with_notifier(Arc::new(TracingNotifier));

    engine.startup(&[]).context("engine startup failed")?;

    let settings = SimulationSettings {
        players: env_or("JOBCRAFT_SIM_PLAYERS", 8),
        rounds: env_or("JOBCRAFT_SIM_ROUNDS", 200),
        ..SimulationSettings::default()
    };
    let summary = run_simulation(&engine, &settings);
    // Shut down even when the session failed, so pending credits are paid.
    let shutdown = engine.shutdown();

    let summary = summary.context("simulation failed")?;
    shutdown.context("engine shutdown failed")?;

    tracing::info!(
        actions = summary.actions,
        level_ups = summary.level_ups,
        paid = economy.total_paid(),
        "simulation finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
