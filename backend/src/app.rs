//! Application state and initialization
//!
//! All services are built here from the loaded configuration and shared
//! through AppState.

use crate::config::AppConfig;
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::services::{
    BabiesService, Clock, Notifier, RemindersService, SystemClock, TracingNotifier,
    VaccinesService,
};
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub vaccines: VaccinesService,
    pub babies: BabiesService,
    pub reminders: RemindersService,
}

impl AppState {
    /// Wire services over an existing repository
    pub fn new(repo: Repository, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self {
        let vaccines = VaccinesService::new(repo.clone());
        let babies = BabiesService::new(repo.clone(), Arc::clone(&clock));
        let reminders = RemindersService::new(
            repo,
            vaccines.clone(),
            babies.clone(),
            clock,
            notifier,
        );

        Self {
            vaccines,
            babies,
            reminders,
        }
    }

    /// Open the database and seed reference data - called once on startup
    pub async fn initialize(config: &AppConfig) -> Result<Self> {
        tracing::info!("Initializing application");
        tracing::info!("Database path: {:?}", config.database_path);

        let pool = create_pool(&config.database_path).await?;
        let state = Self::new(
            Repository::new(pool),
            Arc::new(SystemClock),
            Arc::new(TracingNotifier),
        );

        if config.seed_vaccines {
            state.vaccines.seed_defaults().await?;
        }

        tracing::info!("Application initialized successfully");

        Ok(state)
    }
}
