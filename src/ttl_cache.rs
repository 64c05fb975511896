use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::log_cache;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// In-memory map whose entries expire a fixed time after insertion.
///
/// There is no size bound and no eviction policy beyond expiry: an expired
/// entry is never returned and is dropped the next time it is looked up or
/// when `evict_expired` runs.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    entries: Arc<RwLock<HashMap<K, CacheEntry<V>>>>,
    ttl: Duration,
    name: &'static str,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            name,
        }
    }

    pub fn with_minutes(name: &'static str, minutes: i64) -> Self {
        Self::new(name, Duration::minutes(minutes))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Retrieve a value if present and not expired
    pub async fn get(&self, key: &K) -> Option<V> {
        let now = Utc::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => {
                    log_cache!(hit, self.name, key = key);
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => {
                    log_cache!(miss, self.name, key = key);
                    return None;
                }
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
            entries.remove(key);
            log_cache!(expired, self.name, key = key);
        }
        None
    }

    pub async fn set(&self, key: K, value: V) {
        let expires_at = Utc::now() + self.ttl;
        let mut entries = self.entries.write().await;
        entries.insert(key, CacheEntry { value, expires_at });
        log_cache!(store, self.name, size = entries.len());
    }

    /// Remove a key regardless of expiry. Returns whether it was present.
    pub async fn evict(&self, key: &K) -> bool {
        let removed = self.entries.write().await.remove(key).is_some();
        if removed {
            log_cache!(evict, self.name, key = key);
        }
        removed
    }

    pub async fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
        log_cache!(clear, self.name);
    }

    pub async fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let entries = self.entries.read().await;
        let expired = entries.values().filter(|e| e.expires_at <= now).count();

        CacheStats {
            total: entries.len(),
            expired,
            valid: entries.len() - expired,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub expired: usize,
    pub valid: usize,
}
