// Size- and time-bounded cache for remote metadata lookups

use crate::error::Result;
use log::debug;
use lru::LruCache;
use parking_lot::Mutex;
use std::future::Future;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Disable caching entirely
    pub bypass: bool,
    pub max_entries: usize,
    pub ttl: Duration,
}

/// LRU cache whose entries also expire after a fixed time-to-live
pub struct MetadataCache<V> {
    settings: CacheSettings,
    entries: Mutex<LruCache<String, (Instant, V)>>,
}

impl<V: Clone> MetadataCache<V> {
    pub fn new(settings: CacheSettings) -> Self {
        let capacity = NonZeroUsize::new(settings.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            settings,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        if self.settings.bypass {
            return None;
        }
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some((stored_at, value)) if stored_at.elapsed() < self.settings.ttl => {
                return Some(value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        if self.settings.bypass {
            return;
        }
        self.entries.lock().put(key.into(), (Instant::now(), value));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached value or run `fetch` and cache its result.
    ///
    /// `force_refresh` skips the read but still stores the fresh value.
    /// Failed fetches are not cached.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, force_refresh: bool, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if !force_refresh && let Some(value) = self.get(key) {
            debug!("Metadata cache hit: {}", key);
            return Ok(value);
        }
        let value = fetch().await?;
        self.insert(key, value.clone());
        Ok(value)
    }
}
