// Vaccine scheduler
// Entry point: loads configuration, opens the store and runs the due-soon digest

use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};
use vaccine_scheduler::app::AppState;
use vaccine_scheduler::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let defaults = AppConfig::default();
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    // Initialize logging with the default filter so config loading is logged
    let (filter, filter_handle) =
        reload::Layer::new(EnvFilter::try_new(defaults.effective_log_filter(rust_log.clone()))?);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().await?;

    // Switch to the configured filter; RUST_LOG still wins
    filter_handle.reload(EnvFilter::try_new(config.effective_log_filter(rust_log))?)?;

    tracing::info!("Starting vaccine scheduler");

    let state = AppState::initialize(&config).await?;

    if config.digest_interval_secs == 0 {
        let sent = state.reminders.sweep_due_soon().await?;
        tracing::info!("Single due-soon sweep sent {} notifications", sent);
        return Ok(());
    }

    let handle = state
        .reminders
        .clone()
        .start_digest_scheduler(Duration::from_secs(config.digest_interval_secs));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    handle.abort();

    Ok(())
}
