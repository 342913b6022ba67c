//! Response cache for GET payloads.
//!
//! Entries are keyed by path plus normalised query string and expire after a
//! per-entry TTL. Expired entries are purged lazily, when read. Writes to a
//! resource invalidate the resource itself and its collection prefix.
//!
//! The cache is unbounded unless `CacheConfig::max_entries` is set, in which
//! case the least recently used entry is evicted first.

use std::num::NonZeroUsize;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use serde_json::Value;
use tutor_types::config::CacheConfig;

use crate::ports::ClockPort;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expiry: DateTime<Utc>,
}

/// Snapshot of what the cache currently holds.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub entries: Vec<(String, DateTime<Utc>)>,
}

pub struct ResponseCache {
    entries: LruCache<String, CacheEntry>,
    default_ttl: Duration,
    clock: Rc<dyn ClockPort>,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig, clock: Rc<dyn ClockPort>) -> Self {
        let entries = match config.max_entries.and_then(NonZeroUsize::new) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            entries,
            default_ttl: Duration::seconds(config.default_ttl_secs as i64),
            clock,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Cached value for `key`, if present and not yet expired.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        match self.entries.get(key) {
            Some(entry) if now < entry.expiry => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }
        self.entries.pop(key);
        log::debug!("cache: expired {}", key);
        None
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let ttl = self.default_ttl;
        self.set_with_ttl(key, value, ttl);
    }

    pub fn set_with_ttl(&mut self, key: impl Into<String>, value: Value, ttl: Duration) {
        let expiry = self.clock.now() + ttl;
        self.entries.put(key.into(), CacheEntry { value, expiry });
    }

    pub fn invalidate(&mut self, key: &str) {
        self.entries.pop(key);
    }

    /// Remove every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&mut self, prefix: &str) {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            self.entries.pop(key.as_str());
        }
        if !doomed.is_empty() {
            log::debug!("cache: invalidated {} entries under {}", doomed.len(), prefix);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let mut entries: Vec<(String, DateTime<Utc>)> = self
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.expiry))
            .collect();
        entries.sort();
        CacheStats {
            size: self.entries.len(),
            entries,
        }
    }
}

/// Path plus a query string with keys sorted, so equal queries share a key.
pub fn cache_key(path: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let mut pairs: Vec<&(String, String)> = query.iter().collect();
    pairs.sort();
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
        serializer.append_pair(k, v);
    }
    format!("{}?{}", path, serializer.finish())
}

/// The collection a resource belongs to: `/a/b/7/` → `/a/b`.
pub fn collection_prefix(path: &str) -> String {
    let path = path.split('?').next().unwrap_or(path);
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => trimmed[..idx].to_string(),
        None => String::new(),
    }
}
