//! Bounded history of realized environments, evicted least-recently-used.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::domain::models::{Fingerprint, RealizedEnv};

/// Recency-ordered cache of realized environments keyed by fingerprint.
///
/// Capacity is the configured `history` size. Lookups promote to
/// most-recent; inserting an existing fingerprint replaces the entry in
/// place and promotes it (eviction happens only when a genuinely new
/// fingerprint lands in a full store). The entry pinned as "in use"
/// by the manager is never evicted, even when it is least recent.
///
/// Misses are values, not errors; no operation here can fail.
#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    pinned: Option<Fingerprint>,
    /// Most recent first.
    entries: Vec<(Fingerprint, Arc<RealizedEnv>)>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            pinned: None,
            entries: Vec::new(),
        }
    }

    /// Look up an environment, promoting it to most-recently-used.
    pub fn get(&mut self, fingerprint: &Fingerprint) -> Option<Arc<RealizedEnv>> {
        let index = self.position(fingerprint)?;
        let entry = self.entries.remove(index);
        let env = Arc::clone(&entry.1);
        self.entries.insert(0, entry);
        trace!(fingerprint = %fingerprint.short(), "history hit");
        Some(env)
    }

    /// Insert or replace an environment under its own fingerprint.
    ///
    /// Environments with unstable fingerprints are silently refused:
    /// impure results must never land in the shared cache.
    pub fn put(&mut self, env: Arc<RealizedEnv>) {
        let fingerprint = env.fingerprint.clone();
        if !fingerprint.is_cacheable() {
            debug!(fingerprint = %fingerprint.short(), "refusing to cache impure environment");
            return;
        }

        if let Some(index) = self.position(&fingerprint) {
            self.entries.remove(index);
        } else if self.entries.len() >= self.capacity {
            self.evict_one();
        }
        self.entries.insert(0, (fingerprint, env));
    }

    /// Explicitly drop an entry, e.g. when build inputs changed out from
    /// under a persisted reference.
    pub fn invalidate(&mut self, fingerprint: &Fingerprint) -> bool {
        match self.position(fingerprint) {
            Some(index) => {
                self.entries.remove(index);
                debug!(fingerprint = %fingerprint.short(), "invalidated history entry");
                true
            }
            None => false,
        }
    }

    /// Mark the manager's current environment; it survives eviction.
    pub fn pin(&mut self, fingerprint: Option<Fingerprint>) {
        self.pinned = fingerprint;
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.position(fingerprint).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, fingerprint: &Fingerprint) -> Option<usize> {
        self.entries.iter().position(|(fp, _)| fp == fingerprint)
    }

    /// Remove the least-recently-used entry that is not pinned. When the
    /// only candidate is pinned, the store temporarily exceeds capacity
    /// rather than dropping an environment a live session depends on.
    fn evict_one(&mut self) {
        let victim = self
            .entries
            .iter()
            .rposition(|(fp, _)| Some(fp) != self.pinned.as_ref());
        if let Some(index) = victim {
            let (fp, _) = self.entries.remove(index);
            debug!(fingerprint = %fp.short(), "evicted least-recently-used environment");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn env(tag: &str, cacheable: bool) -> Arc<RealizedEnv> {
        Arc::new(RealizedEnv {
            vars: BTreeMap::new(),
            library_paths: vec![],
            profile: None,
            built_at: Utc::now(),
            fingerprint: Fingerprint::new(tag.to_string(), cacheable),
            stage: 1,
        })
    }

    fn fp(tag: &str) -> Fingerprint {
        Fingerprint::new(tag.to_string(), true)
    }

    #[test]
    fn lru_eviction_keeps_most_recent() {
        let mut store = HistoryStore::new(2);
        store.put(env("f1", true));
        store.put(env("f2", true));
        store.put(env("f3", true));

        assert!(store.get(&fp("f1")).is_none());
        assert!(store.get(&fp("f2")).is_some());
        assert!(store.get(&fp("f3")).is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn get_promotes_to_most_recent() {
        let mut store = HistoryStore::new(2);
        store.put(env("f1", true));
        store.put(env("f2", true));
        // Touch f1, then insert f3: f2 is now least recent and evicted.
        assert!(store.get(&fp("f1")).is_some());
        store.put(env("f3", true));

        assert!(store.get(&fp("f1")).is_some());
        assert!(store.get(&fp("f2")).is_none());
    }

    #[test]
    fn reinsert_replaces_without_eviction() {
        let mut store = HistoryStore::new(2);
        store.put(env("f1", true));
        store.put(env("f2", true));
        // Same fingerprint again: promote-if-present, evict-only-if-new.
        store.put(env("f1", true));

        assert_eq!(store.len(), 2);
        assert!(store.get(&fp("f2")).is_some());
    }

    #[test]
    fn pinned_entry_survives_eviction() {
        let mut store = HistoryStore::new(2);
        store.put(env("f1", true));
        store.put(env("f2", true));
        store.pin(Some(fp("f1")));
        store.put(env("f3", true));

        // f1 was least recent but pinned; f2 got evicted instead.
        assert!(store.get(&fp("f1")).is_some());
        assert!(store.get(&fp("f2")).is_none());
        assert!(store.get(&fp("f3")).is_some());
    }

    #[test]
    fn pinned_only_entry_lets_store_exceed_capacity() {
        let mut store = HistoryStore::new(1);
        store.put(env("f1", true));
        store.pin(Some(fp("f1")));
        store.put(env("f2", true));

        assert!(store.get(&fp("f1")).is_some());
        assert!(store.get(&fp("f2")).is_some());
    }

    #[test]
    fn impure_environments_are_never_stored() {
        let mut store = HistoryStore::new(2);
        store.put(env("f1", false));
        assert!(store.is_empty());
        assert!(store.get(&Fingerprint::new("f1".into(), false)).is_none());
    }

    #[test]
    fn invalidate_removes_entry() {
        let mut store = HistoryStore::new(2);
        store.put(env("f1", true));
        assert!(store.invalidate(&fp("f1")));
        assert!(!store.invalidate(&fp("f1")));
        assert!(store.is_empty());
    }
}
