// =============================================================================
// TTL Cache — bounds upstream request volume independent of refresh cadence
// =============================================================================
//
// One cache per endpoint, keyed by the request parameters.  Entries expire
// `ttl` after insertion.  A zero TTL disables the cache entirely, so both
// `get` and `insert` become no-ops.
//
// Time is read from `tokio::time::Instant` so tests can drive expiry with a
// paused clock.
// =============================================================================

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::debug;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Thread-safe time-to-live cache.
pub struct TtlCache<V> {
    name: &'static str,
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return a clone of the cached value if it is still fresh.
    pub fn get(&self, key: &str) -> Option<V> {
        if self.ttl.is_zero() {
            return None;
        }
        let map = self.entries.read();
        let entry = map.get(key)?;
        if entry.inserted_at.elapsed() < self.ttl {
            debug!(cache = self.name, key, "cache hit");
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Store `value` under `key`, replacing any previous entry, and drop
    /// every entry that has already expired.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        if self.ttl.is_zero() {
            return;
        }
        let ttl = self.ttl;
        let mut map = self.entries.write();
        map.retain(|_, e| e.inserted_at.elapsed() < ttl);
        map.insert(
            key.into(),
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
impl<V> TtlCache<V> {
    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.read().len())
            .finish()
    }
}
