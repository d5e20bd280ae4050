// src/cache.rs
//! Preview-to-confirm bridge: news found by a preview is parked here until
//! the matching confirm consumes it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge};

use crate::models::{NewsItem, SearchMode, Source};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub topic: String,
    pub days_back: u32,
    pub mode: SearchMode,
}

impl CacheKey {
    pub fn new(topic: &str, days_back: u32, mode: SearchMode) -> Self {
        Self {
            topic: topic.to_string(),
            days_back,
            mode,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.topic, self.days_back, self.mode.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub news_items: Vec<NewsItem>,
    pub sources: Vec<Source>,
    pub timestamp: DateTime<Utc>,
}

/// Store interface so the pipeline can be tested against any backing map.
/// `take` is get-and-delete in one step.
pub trait PreviewStore: Send + Sync {
    fn insert(&self, key: CacheKey, entry: CacheEntry);
    fn take(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<CacheEntry>;
    /// Drop expired entries, returning how many went.
    fn purge_expired(&self, now: DateTime<Utc>) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process map with an absolute TTL counted from insertion.
pub struct InMemoryPreviewStore {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl InMemoryPreviewStore {
    pub fn new(ttl: std::time::Duration) -> Self {
        let ttl = Duration::from_std(ttl).unwrap_or_else(|_| Duration::seconds(1800));
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn expired(&self, e: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - e.timestamp >= self.ttl
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl PreviewStore for InMemoryPreviewStore {
    fn insert(&self, key: CacheKey, entry: CacheEntry) {
        let purged = self.purge_expired(entry.timestamp);
        if purged > 0 {
            tracing::debug!(purged, "expired previews dropped");
        }
        let mut map = self.lock();
        map.insert(key, entry);
        gauge!("preview_cache_entries").set(map.len() as f64);
    }

    fn take(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<CacheEntry> {
        let mut map = self.lock();
        let entry = map.remove(key);
        gauge!("preview_cache_entries").set(map.len() as f64);
        match entry {
            Some(e) if !self.expired(&e, now) => {
                counter!("preview_cache_hits_total").increment(1);
                Some(e)
            }
            Some(_) => {
                counter!("preview_cache_expired_total").increment(1);
                counter!("preview_cache_misses_total").increment(1);
                None
            }
            None => {
                counter!("preview_cache_misses_total").increment(1);
                None
            }
        }
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut map = self.lock();
        let before = map.len();
        map.retain(|_, e| !self.expired(e, now));
        before - map.len()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            news_items: vec![],
            sources: vec![Source {
                title: "t".into(),
                uri: "https://x.example".into(),
            }],
            timestamp: at,
        }
    }

    #[test]
    fn take_consumes_entry() {
        let store = InMemoryPreviewStore::new(std::time::Duration::from_secs(60));
        let t0 = Utc::now();
        let k = CacheKey::new("budget", 7, SearchMode::Title);
        store.insert(k.clone(), entry(t0));
        assert_eq!(store.len(), 1);
        assert!(store.take(&k, t0).is_some());
        assert!(store.take(&k, t0).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn keys_differ_by_every_part() {
        let store = InMemoryPreviewStore::new(std::time::Duration::from_secs(60));
        let t0 = Utc::now();
        store.insert(CacheKey::new("budget", 7, SearchMode::Title), entry(t0));
        assert!(store.take(&CacheKey::new("budget", 7, SearchMode::All), t0).is_none());
        assert!(store.take(&CacheKey::new("budget", 8, SearchMode::Title), t0).is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(CacheKey::new("budget", 7, SearchMode::All).to_string(), "budget|7|all");
    }

    #[test]
    fn entries_expire_after_ttl() {
        let store = InMemoryPreviewStore::new(std::time::Duration::from_secs(60));
        let t0 = Utc::now();
        let k = CacheKey::new("budget", 7, SearchMode::Title);
        store.insert(k.clone(), entry(t0));
        let later = t0 + Duration::seconds(61);
        assert_eq!(store.purge_expired(later), 1);

        store.insert(k.clone(), entry(t0));
        assert!(store.take(&k, later).is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn insert_drops_expired_entries() {
        let store = InMemoryPreviewStore::new(std::time::Duration::from_secs(60));
        let t0 = Utc::now();
        store.insert(CacheKey::new("budget", 7, SearchMode::Title), entry(t0));
        store.insert(CacheKey::new("budget", 7, SearchMode::All), entry(t0 + Duration::seconds(30)));
        assert_eq!(store.len(), 2);

        store.insert(CacheKey::new("tax", 7, SearchMode::All), entry(t0 + Duration::seconds(61)));
        assert_eq!(store.len(), 2);
        assert!(store
            .take(&CacheKey::new("budget", 7, SearchMode::Title), t0 + Duration::seconds(61))
            .is_none());
    }
}
