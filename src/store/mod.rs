//! Per-key admission state storage.
//!
//! The limiter core reaches storage only through the [`StateStore`] trait,
//! which abstracts over the in-process [`MemoryStore`] and the Redis-backed
//! [`RedisStore`].

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Counter and block-marker storage for arbitrary string keys.
///
/// A key's counter and its block marker are independent records with
/// independent expiries: clearing or expiring one never touches the other.
/// In particular, a key whose block has lapsed may still carry a stale
/// counter until the counter's own window runs out.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Current count for `key`.
    ///
    /// A key with no record, whether never written or already expired,
    /// reads as `0`.
    async fn count(&self, key: &str) -> Result<u64>;

    /// Atomically add one to the counter for `key`.
    ///
    /// The write that creates the counter also arms its window TTL; later
    /// increments within the same window must not extend it.
    async fn increment(&self, key: &str) -> Result<()>;

    /// Mark `key` blocked until now + `duration`, overwriting any earlier
    /// block state.
    async fn block(&self, key: &str, duration: Duration) -> Result<()>;

    /// Whether `key` is inside an active block window.
    ///
    /// An expired block reads as not blocked and may be purged on the way
    /// out. This call has no error path: a backend failure degrades to
    /// `false` (fail-open) and is logged.
    async fn is_blocked(&self, key: &str) -> bool;
}
