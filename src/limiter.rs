//! Core admission decision engine.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::LimiterConfig;
use crate::store::StateStore;

/// Fixed-window, per-key admission gate.
///
/// The limiter holds no per-key state of its own; every decision is
/// composed from reads and writes against the bound [`StateStore`], so one
/// instance can be shared across any number of concurrent tasks.
///
/// The count read and the increment are two separate store calls. Two
/// concurrent calls for the same key can therefore both observe
/// `limit - 1` and both be admitted, overshooting the limit by one. That
/// overshoot is an accepted property of this design; a backend with an
/// atomic compare-and-increment primitive would be needed to close it.
pub struct RateLimiter {
    config: LimiterConfig,
    store: Arc<dyn StateStore>,
}

impl RateLimiter {
    /// Create a limiter enforcing `config` against `store`.
    pub fn new(config: LimiterConfig, store: Arc<dyn StateStore>) -> Self {
        Self { config, store }
    }

    /// The configuration this limiter enforces.
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Decide whether the request identified by `key` is admitted.
    ///
    /// Denials are indistinguishable by return value: an active block, an
    /// exhausted quota, and a store failure all come back `false`. Store
    /// failures never propagate; counter reads and increments fail closed
    /// (deny), while a failed block write still denies this request but
    /// leaves the key unblocked for later ones.
    pub async fn allow(&self, key: &str) -> bool {
        trace!(key = %key, "Checking admission");

        if self.store.is_blocked(key).await {
            debug!(key = %key, "Key is blocked");
            return false;
        }

        let current = match self.store.count(key).await {
            Ok(count) => count,
            Err(e) => {
                warn!(key = %key, error = %e, "Count lookup failed, denying request");
                return false;
            }
        };

        let new_count = current + 1;
        if new_count > self.config.limit {
            debug!(
                key = %key,
                count = new_count,
                limit = self.config.limit,
                "Limit exceeded, blocking key"
            );
            // Best effort: the deny stands even if the block write is
            // lost, and the key stays unblocked until a later call lands
            // one.
            if let Err(e) = self.store.block(key, self.config.block_time()).await {
                warn!(key = %key, error = %e, "Failed to block key");
            }
            return false;
        }

        if let Err(e) = self.store.increment(key).await {
            warn!(key = %key, error = %e, "Counter increment failed, denying request");
            return false;
        }

        trace!(key = %key, count = new_count, "Request admitted");
        true
    }
}
