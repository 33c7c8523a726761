//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and infrastructure.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{
    ActivityBroadcaster, Cache, Database, FileStorage, HealthCheck, LocalStorage, Probes,
    RateLimiter,
};
use crate::services::Services;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Application services
    pub services: Services,
    /// Fixed-window counters for login and uploads
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// Connectivity probes
    pub health: Arc<dyn HealthCheck>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the production state from live connections.
    pub fn from_config(database: Database, cache: Cache, config: Config) -> Self {
        let storage: Arc<dyn FileStorage> = Arc::new(LocalStorage::new(&config.storage_root));
        let broadcaster = ActivityBroadcaster::new(crate::config::ACTIVITY_CHANNEL_CAPACITY);
        let services = Services::from_parts(
            database.get_connection(),
            storage,
            broadcaster,
            config.clone(),
        );

        Self {
            services,
            rate_limiter: Arc::new(cache.clone()),
            health: Arc::new(Probes::new(database, cache)),
            config: Arc::new(config),
        }
    }

    /// Create state from already built parts.
    pub fn new(
        services: Services,
        rate_limiter: Arc<dyn RateLimiter>,
        health: Arc<dyn HealthCheck>,
        config: Config,
    ) -> Self {
        Self {
            services,
            rate_limiter,
            health,
            config: Arc::new(config),
        }
    }
}
