//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - Database connections and repositories
//! - Caching systems (Redis) backing rate limits
//! - File storage for uploads
//! - In-process broadcast of activity entries
//! - Health probes

pub mod broadcaster;
pub mod cache;
pub mod db;
pub mod health;
pub mod repositories;
pub mod storage;

pub use broadcaster::ActivityBroadcaster;
pub use cache::{Cache, RateDecision, RateLimiter};
pub use db::{Database, Migrator};
pub use health::{HealthCheck, Probes};
pub use storage::{FileStorage, LocalStorage};

#[cfg(any(test, feature = "test-utils"))]
pub use cache::MockRateLimiter;
#[cfg(any(test, feature = "test-utils"))]
pub use health::MockHealthCheck;
#[cfg(any(test, feature = "test-utils"))]
pub use storage::MockFileStorage;
