//! Transient in-process storage backend.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::StateStore;
use crate::error::Result;

/// A counter together with the window expiry armed on its first increment.
#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    count: u64,
    expires_at: Instant,
}

/// Transient storage backend holding all state in one mutex-guarded map.
///
/// Expiry is lazy: entries are evaluated against the clock on read and
/// purged when found stale. State lives only in the current process, so
/// this backend is suitable for tests and single-instance deployments;
/// use [`RedisStore`](super::RedisStore) when several instances must agree
/// on one count per key.
pub struct MemoryStore {
    window: Duration,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    counters: HashMap<String, CounterEntry>,
    blocks: HashMap<String, Instant>,
}

impl MemoryStore {
    /// Create a store whose counters expire `window` after their first
    /// increment.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Clear the counter for `key`, unless the key is still blocked.
    ///
    /// Returns whether the counter was cleared. A blocked key keeps its
    /// stale counter until the block has lapsed; callers that want a fresh
    /// window after a lockout call this once the block is gone.
    pub fn reset(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();

        if let Some(until) = inner.blocks.get(key) {
            if Instant::now() < *until {
                debug!(key = %key, "Counter reset refused, key is still blocked");
                return false;
            }
        }

        inner.counters.remove(key);
        debug!(key = %key, "Counter reset");
        true
    }

    /// Number of live counters.
    ///
    /// This is primarily useful for testing.
    pub fn counter_count(&self) -> usize {
        let now = Instant::now();
        let inner = self.inner.lock();
        inner
            .counters
            .values()
            .filter(|entry| now < entry.expires_at)
            .count()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn count(&self, key: &str) -> Result<u64> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        match inner.counters.get(key) {
            Some(entry) if now < entry.expires_at => Ok(entry.count),
            Some(_) => {
                inner.counters.remove(key);
                Ok(0)
            }
            None => Ok(0),
        }
    }

    async fn increment(&self, key: &str) -> Result<()> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        match inner.counters.get_mut(key) {
            Some(entry) if now < entry.expires_at => {
                entry.count += 1;
            }
            _ => {
                // First write of the window arms the TTL; later increments
                // leave it untouched.
                inner.counters.insert(
                    key.to_string(),
                    CounterEntry {
                        count: 1,
                        expires_at: now + self.window,
                    },
                );
            }
        }

        Ok(())
    }

    async fn block(&self, key: &str, duration: Duration) -> Result<()> {
        let until = Instant::now() + duration;
        let mut inner = self.inner.lock();
        inner.blocks.insert(key.to_string(), until);

        debug!(key = %key, duration = ?duration, "Key blocked");
        Ok(())
    }

    async fn is_blocked(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        match inner.blocks.get(key) {
            Some(until) if now < *until => true,
            Some(_) => {
                inner.blocks.remove(key);
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unseen_key_counts_zero() {
        let store = MemoryStore::new(Duration::from_secs(60));

        assert_eq!(store.count("nobody").await.unwrap(), 0);
        assert!(!store.is_blocked("nobody").await);
    }

    #[tokio::test]
    async fn test_increment_accumulates() {
        let store = MemoryStore::new(Duration::from_secs(60));

        for _ in 0..4 {
            store.increment("user1").await.unwrap();
        }

        assert_eq!(store.count("user1").await.unwrap(), 4);
        assert_eq!(store.counter_count(), 1);
    }

    #[tokio::test]
    async fn test_counters_are_per_key() {
        let store = MemoryStore::new(Duration::from_secs(60));

        store.increment("user1").await.unwrap();
        store.increment("user1").await.unwrap();
        store.increment("user2").await.unwrap();

        assert_eq!(store.count("user1").await.unwrap(), 2);
        assert_eq!(store.count("user2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_counter_expires_after_window() {
        let store = MemoryStore::new(Duration::from_millis(80));

        store.increment("user1").await.unwrap();
        assert_eq!(store.count("user1").await.unwrap(), 1);

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(store.count("user1").await.unwrap(), 0);
        assert_eq!(store.counter_count(), 0);
    }

    #[tokio::test]
    async fn test_increment_does_not_extend_window() {
        let store = MemoryStore::new(Duration::from_millis(150));

        store.increment("user1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(90)).await;

        // Still inside the window, so this bumps the count without
        // rearming the TTL.
        store.increment("user1").await.unwrap();
        assert_eq!(store.count("user1").await.unwrap(), 2);

        tokio::time::sleep(Duration::from_millis(90)).await;

        // Past the original expiry, even though the second increment was
        // recent.
        assert_eq!(store.count("user1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_block_and_expiry() {
        let store = MemoryStore::new(Duration::from_secs(60));

        store
            .block("user1", Duration::from_millis(80))
            .await
            .unwrap();
        assert!(store.is_blocked("user1").await);

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(!store.is_blocked("user1").await);
    }

    #[tokio::test]
    async fn test_block_overwrites_prior_block() {
        let store = MemoryStore::new(Duration::from_secs(60));

        store.block("user1", Duration::from_secs(60)).await.unwrap();
        store
            .block("user1", Duration::from_millis(50))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!store.is_blocked("user1").await);
    }

    #[tokio::test]
    async fn test_block_leaves_counter_alone() {
        let store = MemoryStore::new(Duration::from_secs(60));

        store.increment("user1").await.unwrap();
        store.increment("user1").await.unwrap();
        store
            .block("user1", Duration::from_millis(50))
            .await
            .unwrap();

        assert_eq!(store.count("user1").await.unwrap(), 2);

        tokio::time::sleep(Duration::from_millis(100)).await;

        // Block expiry does not reset the counter either.
        assert!(!store.is_blocked("user1").await);
        assert_eq!(store.count("user1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reset_refused_while_blocked() {
        let store = MemoryStore::new(Duration::from_secs(60));

        store.increment("user1").await.unwrap();
        store
            .block("user1", Duration::from_millis(80))
            .await
            .unwrap();

        assert!(!store.reset("user1"));
        assert_eq!(store.count("user1").await.unwrap(), 1);

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(store.reset("user1"));
        assert_eq!(store.count("user1").await.unwrap(), 0);
    }
}
