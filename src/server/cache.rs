//! Short-lived snapshot cache keyed by digest.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_CAPACITY: usize = 64;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A bounded in-memory map whose entries expire after a fixed TTL.
///
/// Expired entries are never returned. When full, expired entries are
/// dropped first, then the entry closest to expiry.
pub struct TtlCache<V> {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .filter(|entry| Instant::now() <= entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    /// Store `value` under `key`, restarting its TTL.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            entries.retain(|_, entry| now <= entry.expires_at);

            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
