//! Redis cache implementation.
//!
//! Backs the fixed-window request counters used for rate limiting.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};

use crate::config::{Config, CACHE_PREFIX_RATE_LIMIT};
use crate::errors::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Outcome of one rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Requests seen in the current window, this one included
    pub count: u64,
    pub allowed: bool,
    /// Seconds until the window resets
    pub retry_after: u64,
}

/// Fixed-window request counter.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request for `identifier` and decide whether it may proceed.
    async fn hit(&self, identifier: &str, max_requests: u64, window_seconds: u64)
        -> AppResult<RateDecision>;
}

/// Redis cache wrapper with connection pooling.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
}

impl Cache {
    /// Try to connect to Redis.
    pub async fn try_connect(config: &Config) -> Result<Self, RedisError> {
        let client = Client::open(config.redis_url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis cache connected");

        Ok(Self { connection })
    }

    /// Get the connection manager for direct Redis operations.
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    /// Check Redis connectivity.
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl RateLimiter for Cache {
    async fn hit(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> AppResult<RateDecision> {
        let key = format!("{}{}", CACHE_PREFIX_RATE_LIMIT, identifier);
        let mut conn = self.connection.clone();

        let count: u64 = conn.incr(&key, 1u64).await?;

        // A counter without expiry opens a new window
        let ttl: i64 = conn.ttl(&key).await?;
        let retry_after = if ttl > 0 {
            ttl as u64
        } else {
            let _: () = conn.expire(&key, window_seconds as i64).await?;
            window_seconds
        };

        Ok(RateDecision {
            count,
            allowed: count <= max_requests,
            retry_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_prefix() {
        assert_eq!(CACHE_PREFIX_RATE_LIMIT, "rate_limit:");
    }
}
