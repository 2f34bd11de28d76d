//! Process-lifetime caches with bounded TTL.
//!
//! Both caches are explicit objects injected into the pipeline rather than
//! module-level state, so tests can run in parallel without
//! cross-contamination. There is no concurrent mutation in the processing
//! model; the interior mutex only satisfies `Send + Sync` bounds.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::traits::ProjectStore;
use crate::types::{DuplicateVerdict, Project};

/// Default TTL for both caches.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

struct ProjectSnapshot {
    projects: Vec<Project>,
    expires_at: Instant,
}

/// Time-bounded snapshot of active projects.
///
/// A read past the expiry triggers a synchronous refetch before any
/// resolver strategy runs. A failed refetch is logged and serves the stale
/// snapshot (or an empty list on cold start) - staleness is never an error.
pub struct ProjectCache {
    store: Arc<dyn ProjectStore>,
    ttl: Duration,
    inner: Mutex<Option<ProjectSnapshot>>,
}

impl ProjectCache {
    /// Create a cache with the default 5-minute TTL.
    pub fn new(store: Arc<dyn ProjectStore>) -> Self {
        Self::with_ttl(store, DEFAULT_CACHE_TTL)
    }

    /// Create a cache with a custom TTL.
    pub fn with_ttl(store: Arc<dyn ProjectStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            inner: Mutex::new(None),
        }
    }

    /// Get the current snapshot, refetching first if it has expired.
    pub async fn get(&self) -> Vec<Project> {
        self.get_at(Instant::now()).await
    }

    /// Get the snapshot as of `now`. Split out for TTL tests.
    pub async fn get_at(&self, now: Instant) -> Vec<Project> {
        {
            let guard = self.inner.lock().unwrap();
            if let Some(snap) = guard.as_ref() {
                if now < snap.expires_at {
                    return snap.projects.clone();
                }
            }
        }
        self.refresh_at(now).await
    }

    /// Force a refetch regardless of expiry.
    pub async fn refresh(&self) -> Vec<Project> {
        self.refresh_at(Instant::now()).await
    }

    async fn refresh_at(&self, now: Instant) -> Vec<Project> {
        match self.store.active_projects().await {
            Ok(projects) => {
                let mut guard = self.inner.lock().unwrap();
                *guard = Some(ProjectSnapshot {
                    projects: projects.clone(),
                    expires_at: now + self.ttl,
                });
                projects
            }
            Err(e) => {
                tracing::warn!("project snapshot refresh failed, serving stale: {}", e);
                let guard = self.inner.lock().unwrap();
                guard
                    .as_ref()
                    .map(|s| s.projects.clone())
                    .unwrap_or_default()
            }
        }
    }

    /// Drop the snapshot so the next read refetches.
    pub fn invalidate(&self) {
        *self.inner.lock().unwrap() = None;
    }
}

struct VerdictEntry {
    verdict: DuplicateVerdict,
    inserted_at: Instant,
}

/// In-memory cache of recent duplicate-check verdicts.
///
/// Invariant: never serves an entry older than the TTL. Size is bounded by
/// `max_entries`; exceeding it evicts the `evict_batch` oldest entries.
pub struct VerdictCache {
    ttl: Duration,
    max_entries: usize,
    evict_batch: usize,
    map: Mutex<HashMap<String, VerdictEntry>>,
}

impl Default for VerdictCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, 1000, 100)
    }
}

impl VerdictCache {
    /// Create a cache with explicit bounds.
    pub fn new(ttl: Duration, max_entries: usize, evict_batch: usize) -> Self {
        Self {
            ttl,
            max_entries,
            evict_batch,
            map: Mutex::new(HashMap::new()),
        }
    }

    /// Get a live verdict for the key.
    pub fn get(&self, key: &str) -> Option<DuplicateVerdict> {
        self.get_at(key, Instant::now())
    }

    /// Get a verdict as of `now`; expired entries are removed and ignored.
    pub fn get_at(&self, key: &str, now: Instant) -> Option<DuplicateVerdict> {
        let mut map = self.map.lock().unwrap();
        match map.get(key) {
            Some(entry) if now.duration_since(entry.inserted_at) < self.ttl => {
                Some(entry.verdict.clone())
            }
            Some(_) => {
                map.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert a verdict, evicting the oldest batch when over capacity.
    pub fn insert(&self, key: impl Into<String>, verdict: DuplicateVerdict) {
        self.insert_at(key, verdict, Instant::now());
    }

    /// Insert a verdict as of `now`. Split out for TTL tests.
    pub fn insert_at(&self, key: impl Into<String>, verdict: DuplicateVerdict, now: Instant) {
        let mut map = self.map.lock().unwrap();
        map.insert(
            key.into(),
            VerdictEntry {
                verdict,
                inserted_at: now,
            },
        );

        if map.len() > self.max_entries {
            let mut by_age: Vec<(String, Instant)> = map
                .iter()
                .map(|(k, v)| (k.clone(), v.inserted_at))
                .collect();
            by_age.sort_by_key(|(_, at)| *at);
            for (key, _) in by_age.into_iter().take(self.evict_batch) {
                map.remove(&key);
            }
        }
    }

    /// Number of cached verdicts (live or not).
    pub fn len(&self) -> usize {
        self.map.lock().unwrap().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all cached verdicts.
    pub fn clear(&self) {
        self.map.lock().unwrap().clear();
    }
}
