//! Time-to-live cache with a background sweeper.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};

use crate::lifecycle::shutdown::Shutdown;

/// Default lifetime of a cached proof.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Default interval between sweeps of expired entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) <= ttl
    }
}

/// Concurrent map whose entries expire a fixed time after they were stored.
///
/// Expired entries are never returned. They are removed lazily on `get` and
/// in bulk by a sweeper task that runs on the tokio runtime current at
/// construction. Without a runtime no sweeper is spawned and only lazy
/// eviction and [`purge_expired`](Self::purge_expired) apply.
pub struct TtlCache<K, V>
where
    K: Eq + Hash,
{
    entries: Arc<DashMap<K, Entry<V>>>,
    ttl: Duration,
    shutdown: Shutdown,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_sweep_interval(ttl, DEFAULT_SWEEP_INTERVAL)
    }

    pub fn with_sweep_interval(ttl: Duration, sweep_interval: Duration) -> Self {
        let entries = Arc::new(DashMap::new());
        let shutdown = Shutdown::new();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let sweep_interval = sweep_interval.max(Duration::from_millis(1));
                handle.spawn(sweep(entries.clone(), ttl, sweep_interval, shutdown.subscribe()));
            }
            Err(_) => {
                tracing::debug!("No tokio runtime; TTL cache sweeper not started");
            }
        }

        Self {
            entries,
            ttl,
            shutdown,
        }
    }

    /// Value for `key` if it was stored no longer than the TTL ago.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now, self.ttl) {
                return Some(entry.value.clone());
            }
        }

        self.entries
            .remove_if(key, |_, entry| !entry.is_live(now, self.ttl));
        None
    }

    pub fn set(&self, key: K, value: V) {
        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn delete(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    /// Stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Remove every expired entry now. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries, self.ttl)
    }

    /// Stop the background sweeper. Entries stay readable.
    pub fn close(&self) {
        self.shutdown.trigger();
    }
}

impl<K: Eq + Hash, V> Drop for TtlCache<K, V> {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

fn purge<K: Eq + Hash, V>(entries: &DashMap<K, Entry<V>>, ttl: Duration) -> usize {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, entry| entry.is_live(now, ttl));
    before.saturating_sub(entries.len())
}

async fn sweep<K: Eq + Hash, V>(
    entries: Arc<DashMap<K, Entry<V>>>,
    ttl: Duration,
    every: Duration,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    let mut ticker = time::interval_at(Instant::now() + every, every);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = purge(&entries, ttl);
                if removed > 0 {
                    tracing::debug!(
                        removed,
                        remaining = entries.len(),
                        "Swept expired cache entries"
                    );
                }
            }
            _ = shutdown.recv() => {
                tracing::debug!("TTL cache sweeper stopped");
                break;
            }
        }
    }
}
