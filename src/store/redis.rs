//! Redis-backed storage backend.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tracing::warn;

use super::StateStore;
use crate::error::Result;

/// Namespace prefix for counter keys.
const COUNTER_PREFIX: &str = "ratelimit:count:";
/// Namespace prefix for block-marker keys.
const BLOCK_PREFIX: &str = "ratelimit:block:";

/// Shared storage backend on a Redis server.
///
/// Counters lean on `INCR` for increment atomicity and on server-side TTLs
/// for window and block expiry, so several service instances pointed at the
/// same server observe one count per key.
pub struct RedisStore {
    client: Client,
    window: Duration,
}

impl RedisStore {
    /// Create a store against `url` (e.g. `redis://127.0.0.1:6379/`) whose
    /// counters expire `window` after their first increment.
    ///
    /// Only the URL is validated here; connections are established lazily
    /// per operation.
    pub fn connect(url: &str, window: Duration) -> Result<Self> {
        let client = Client::open(url)?;
        Ok(Self { client, window })
    }

    async fn conn(&self) -> Result<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    fn counter_key(key: &str) -> String {
        format!("{}{}", COUNTER_PREFIX, key)
    }

    fn block_key(key: &str) -> String {
        format!("{}{}", BLOCK_PREFIX, key)
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn count(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn().await?;
        let value: Option<u64> = conn.get(Self::counter_key(key)).await?;
        Ok(value.unwrap_or(0))
    }

    async fn increment(&self, key: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let counter_key = Self::counter_key(key);

        let count: u64 = conn.incr(&counter_key, 1u64).await?;
        if count == 1 {
            // First entry in the window arms the TTL so the counter
            // naturally resets; later increments leave it untouched.
            let _: () = conn
                .expire(&counter_key, self.window.as_secs() as i64)
                .await?;
        }

        Ok(())
    }

    async fn block(&self, key: &str, duration: Duration) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .set_ex(Self::block_key(key), 1u8, duration.as_secs())
            .await?;
        Ok(())
    }

    async fn is_blocked(&self, key: &str) -> bool {
        // The signature has no error path: a backend failure here resolves
        // to "not blocked" rather than stalling admission.
        let mut conn = match self.conn().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(key = %key, error = %e, "Block lookup failed, treating key as unblocked");
                return false;
            }
        };

        match conn.exists(Self::block_key(key)).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(key = %key, error = %e, "Block lookup failed, treating key as unblocked");
                false
            }
        }
    }
}
