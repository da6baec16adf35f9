//! In-memory caches for compiled tag filters and whole resolutions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use regex::{Regex, RegexBuilder};

use crate::catalog::CatalogSnapshot;
use crate::resolver::Resolution;
use crate::CoreError;

/// Compiled case-insensitive filter patterns keyed by their source string.
///
/// Compilation failures are cached too, so a broken filter is reported the
/// same way on every resolution without being recompiled.
#[derive(Debug, Default)]
pub struct PatternCache {
    inner: RwLock<HashMap<String, Result<Regex, CoreError>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `pattern` (or fetch the cached result).
    pub fn compile(&self, pattern: &str) -> Result<Regex, CoreError> {
        {
            let store = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = store.get(pattern) {
                return cached.clone();
            }
        }

        let compiled = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|error| CoreError::InvalidFilterPattern {
                pattern: pattern.to_owned(),
                reason: error.to_string(),
            });

        let mut store = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        store
            .entry(pattern.to_owned())
            .or_insert(compiled)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[derive(Debug)]
struct CachedResolution {
    snapshot: Arc<CatalogSnapshot>,
    resolution: Arc<Resolution>,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<u64, CachedResolution>,
    order: VecDeque<u64>,
    capacity: usize,
}

impl CacheInner {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    /// A fingerprint hit only counts when the stored snapshot is equal.
    fn get(&self, fingerprint: u64, snapshot: &CatalogSnapshot) -> Option<Arc<Resolution>> {
        self.map
            .get(&fingerprint)
            .filter(|cached| *cached.snapshot == *snapshot)
            .map(|cached| Arc::clone(&cached.resolution))
    }

    fn put(&mut self, fingerprint: u64, snapshot: &CatalogSnapshot, resolution: Arc<Resolution>) {
        let entry = CachedResolution {
            snapshot: Arc::new(snapshot.clone()),
            resolution,
        };
        if self.map.insert(fingerprint, entry).is_none() {
            self.order.push_back(fingerprint);
        }
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.map.remove(&evicted);
            }
        }
    }

    fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}

/// Resolutions keyed by the content fingerprint of the snapshot they were computed from.
///
/// Each entry keeps its snapshot, so two snapshots sharing a fingerprint never
/// share a resolution. Oldest entries are evicted first once `capacity` is
/// reached. A capacity of zero disables caching.
#[derive(Debug, Clone)]
pub struct ResolutionCache {
    inner: Arc<RwLock<CacheInner>>,
}

impl ResolutionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner::new(capacity))),
        }
    }

    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn get(&self, snapshot: &CatalogSnapshot) -> Option<Arc<Resolution>> {
        self.get_keyed(snapshot.fingerprint(), snapshot)
    }

    /// No-op when the cache is disabled.
    pub fn put(&self, snapshot: &CatalogSnapshot, resolution: Arc<Resolution>) {
        self.put_keyed(snapshot.fingerprint(), snapshot, resolution);
    }

    fn get_keyed(&self, fingerprint: u64, snapshot: &CatalogSnapshot) -> Option<Arc<Resolution>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(fingerprint, snapshot)
    }

    fn put_keyed(&self, fingerprint: u64, snapshot: &CatalogSnapshot, resolution: Arc<Resolution>) {
        let mut store = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if store.capacity == 0 {
            return;
        }
        store.put(fingerprint, snapshot, resolution);
    }

    /// Drop every entry, e.g. after a catalog write.
    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .map
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_disabled(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .capacity
            == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_case_insensitive_patterns() {
        let cache = PatternCache::new();
        let regex = cache.compile("^ed").expect("valid pattern");
        assert!(regex.is_match("EDH23_Cal"));
        assert_eq!(cache.len(), 1);

        cache.compile("^ed").expect("cached pattern");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn caches_compile_failures() {
        let cache = PatternCache::new();
        let first = cache.compile("(unclosed").expect_err("must fail");
        let second = cache.compile("(unclosed").expect_err("must fail");
        assert_eq!(first, second);
        assert!(matches!(first, CoreError::InvalidFilterPattern { ref pattern, .. } if pattern == "(unclosed"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    fn snapshot(instrument: &str) -> CatalogSnapshot {
        let mut snapshot = CatalogSnapshot::default();
        snapshot.catalog.link_instrument("rates", instrument);
        snapshot
    }

    #[test]
    fn resolution_cache_basic_operations() {
        let cache = ResolutionCache::new(4);
        let first = snapshot("EDH23");
        assert!(cache.get(&first).is_none());

        cache.put(&first, Arc::new(Resolution::default()));
        assert!(cache.get(&first).is_some());
        assert!(cache.get(&first.clone()).is_some());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn resolution_cache_evicts_oldest() {
        let cache = ResolutionCache::new(2);
        let (one, two, three) = (snapshot("EDH23"), snapshot("EDM23"), snapshot("EDU23"));
        cache.put(&one, Arc::new(Resolution::default()));
        cache.put(&two, Arc::new(Resolution::default()));
        cache.put(&one, Arc::new(Resolution::default()));
        cache.put(&three, Arc::new(Resolution::default()));

        assert!(cache.get(&one).is_none());
        assert!(cache.get(&two).is_some());
        assert!(cache.get(&three).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn colliding_fingerprint_does_not_serve_another_snapshot() {
        let cache = ResolutionCache::new(4);
        let stored = snapshot("EDH23");
        let other = snapshot("EDM23");

        cache.put_keyed(42, &stored, Arc::new(Resolution::default()));

        assert!(cache.get_keyed(42, &stored).is_some());
        assert!(cache.get_keyed(42, &other).is_none());
    }

    #[test]
    fn disabled_resolution_cache_stores_nothing() {
        let cache = ResolutionCache::disabled();
        assert!(cache.is_disabled());

        let only = snapshot("EDH23");
        cache.put(&only, Arc::new(Resolution::default()));
        assert!(cache.get(&only).is_none());
        assert_eq!(cache.len(), 0);
    }
}
