//! Duplicate detection against recently created records.
//!
//! Similarity is normalized edit distance on lower-cased display texts,
//! with an optional boost when both texts use action words from the same
//! synonym group ("setup" vs "configure"). The first existing record at or
//! above the threshold wins and iteration stops: suppression only needs
//! "is there already something like this", not the closest match, and
//! short-circuiting bounds the worst case.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::VerdictCache;
use crate::config::DedupConfig;
use crate::traits::{EntityStore, RecentFilter};
use crate::types::{CandidateEntity, DuplicateVerdict, EntityKind, StoredEntity};

const CACHE_KEY_CHARS: usize = 50;
const SYNONYM_BOOST: f64 = 0.15;

/// Action words partitioned into equivalence classes. Same-group
/// membership is a single index lookup, not a scan over entries.
pub struct SynonymTable {
    groups: Vec<Vec<&'static str>>,
    index: HashMap<&'static str, usize>,
}

static DEFAULT_GROUPS: Lazy<Vec<Vec<&'static str>>> = Lazy::new(|| {
    vec![
        vec!["setup", "set up", "configure", "establish", "initialize"],
        vec!["complete", "finish", "finalize", "wrap up"],
        vec!["review", "check", "examine", "look over"],
        vec!["create", "make", "build", "draft"],
        vec!["update", "revise", "modify", "edit"],
        vec!["send", "submit", "deliver", "share"],
        vec!["schedule", "book", "arrange", "plan"],
        vec!["prepare", "prep", "get ready"],
    ]
});

impl Default for SynonymTable {
    fn default() -> Self {
        Self::new(DEFAULT_GROUPS.clone())
    }
}

impl SynonymTable {
    /// Build a table from explicit groups.
    pub fn new(groups: Vec<Vec<&'static str>>) -> Self {
        let mut index = HashMap::new();
        for (group_id, group) in groups.iter().enumerate() {
            for term in group {
                index.insert(*term, group_id);
            }
        }
        Self { groups, index }
    }

    /// The group id a term belongs to, if any.
    pub fn group_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// Whether the two texts contain terms from the same group. The terms
    /// need not be the same word - that is the point.
    pub fn share_group(&self, a: &str, b: &str) -> bool {
        for group in &self.groups {
            let in_a = group.iter().any(|term| a.contains(term));
            if !in_a {
                continue;
            }
            if group.iter().any(|term| b.contains(term)) {
                return true;
            }
        }
        false
    }
}

/// Classic two-row Levenshtein distance.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Similarity of two already-normalized texts in [0, 1].
///
/// Exact equality is 1.0; otherwise `(max_len - distance) / max_len`, plus
/// the synonym boost when a table is supplied and both texts carry a term
/// from the same group. Capped at 1.0.
pub fn similarity(a: &str, b: &str, synonyms: Option<&SynonymTable>) -> f64 {
    if a == b {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let distance = edit_distance(a, b);
    let mut score = (max_len - distance) as f64 / max_len as f64;

    if let Some(table) = synonyms {
        if table.share_group(a, b) {
            score = (score + SYNONYM_BOOST).min(1.0);
        }
    }
    score
}

/// Duplicate detector with a time-bounded verdict cache.
pub struct DuplicateDetector {
    store: Arc<dyn EntityStore>,
    config: DedupConfig,
    synonyms: SynonymTable,
    cache: VerdictCache,
}

impl DuplicateDetector {
    /// Create a detector over the given store.
    pub fn new(store: Arc<dyn EntityStore>, config: DedupConfig) -> Self {
        let cache = VerdictCache::new(
            config.cache_ttl(),
            config.cache_max_entries,
            config.cache_evict_batch,
        );
        Self {
            store,
            config,
            synonyms: SynonymTable::default(),
            cache,
        }
    }

    /// Replace the synonym table.
    pub fn with_synonyms(mut self, synonyms: SynonymTable) -> Self {
        self.synonyms = synonyms;
        self
    }

    /// Access the verdict cache (used by TTL tests).
    pub fn cache(&self) -> &VerdictCache {
        &self.cache
    }

    /// Check a candidate against recently created same-kind records.
    ///
    /// Store read failures are logged and answered as "not a duplicate";
    /// one flaky read must not suppress an entity or halt the batch.
    pub async fn check(
        &self,
        candidate: &CandidateEntity,
        project_id: Option<&str>,
    ) -> DuplicateVerdict {
        let kind = candidate.kind();
        let key = cache_key(kind, candidate.display_text());

        if let Some(verdict) = self.cache.get(&key) {
            tracing::debug!(key = %key, "duplicate verdict served from cache");
            return verdict;
        }

        let filter = RecentFilter {
            kind,
            window_days: self.config.window_days,
            project_id: project_id.map(|s| s.to_string()),
            include_completed: self.config.include_completed,
            limit: self.config.fetch_limit,
        };

        let existing = match self.store.recent(&filter).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("recent-record fetch failed, treating as no duplicate: {}", e);
                return DuplicateVerdict::not_duplicate();
            }
        };

        let normalized = candidate.display_text().to_lowercase();
        let synonyms = self.config.synonym_boost.then_some(&self.synonyms);

        let mut verdict = DuplicateVerdict::not_duplicate();
        for record in existing {
            let score = similarity(&normalized, &record.text.to_lowercase(), synonyms);
            if score >= self.config.threshold {
                tracing::debug!(
                    matched = %record.id,
                    similarity = score,
                    "duplicate candidate suppressed"
                );
                verdict = DuplicateVerdict {
                    is_duplicate: true,
                    matched: Some(record),
                    similarity: Some(score),
                };
                break;
            }
        }

        self.cache.insert(key, verdict.clone());
        verdict
    }

    /// Overwrite the cached verdict after a candidate was persisted.
    ///
    /// A "not a duplicate" verdict goes stale the moment the record
    /// lands in the store; without this, re-submitting the same item
    /// within the cache TTL would create a second row.
    pub fn record_created(&self, kind: EntityKind, display_text: &str, stored: StoredEntity) {
        let key = cache_key(kind, display_text);
        self.cache.insert(
            key,
            DuplicateVerdict {
                is_duplicate: true,
                matched: Some(stored),
                similarity: Some(1.0),
            },
        );
    }
}

fn cache_key(kind: EntityKind, display_text: &str) -> String {
    let prefix: String = display_text.chars().take(CACHE_KEY_CHARS).collect();
    format!("{}:{}", kind.as_str(), prefix.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SiftResult;
    use crate::types::{SourceKind, StoredEntity, TaskCandidate, Urgency};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    fn task(title: &str) -> CandidateEntity {
        CandidateEntity::Task(TaskCandidate {
            title: title.to_string(),
            description: String::new(),
            urgency: Urgency::Soon,
            due_date: None,
            confidence: 0.8,
            source: SourceKind::Note,
            detected_from: String::new(),
        })
    }

    fn stored(id: &str, text: &str) -> StoredEntity {
        StoredEntity {
            id: id.to_string(),
            kind: EntityKind::Task,
            text: text.to_string(),
            project_id: None,
            completed: false,
            created_at: Utc::now(),
        }
    }

    struct FixedStore {
        records: Vec<StoredEntity>,
        calls: Mutex<usize>,
    }

    impl FixedStore {
        fn new(records: Vec<StoredEntity>) -> Self {
            Self {
                records,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl EntityStore for FixedStore {
        async fn recent(&self, _filter: &RecentFilter) -> SiftResult<Vec<StoredEntity>> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.records.clone())
        }
        async fn insert_task(&self, _task: &crate::types::TaskRecord) -> SiftResult<()> {
            Ok(())
        }
        async fn insert_event(&self, _event: &crate::types::EventRecord) -> SiftResult<()> {
            Ok(())
        }
        async fn insert_narrative(
            &self,
            _entry: &crate::types::NarrativeRecord,
        ) -> SiftResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_edit_distance_basics() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }

    #[test]
    fn test_similarity_exact_match() {
        assert_eq!(similarity("send deck", "send deck", None), 1.0);
    }

    #[test]
    fn test_similarity_at_threshold_boundary() {
        // 10 chars, distance 2: similarity is exactly 8/10 = 0.80.
        let a = "abcdefghij";
        let b = "abcdefghxy";
        assert_eq!(similarity(a, b, None), 0.80);
        assert!(similarity(a, b, None) >= 0.80);

        // 100 chars, distance 21: similarity is 79/100 = 0.79, under it.
        let a = "a".repeat(100);
        let b = format!("{}{}", "a".repeat(79), "b".repeat(21));
        assert_eq!(similarity(&a, &b, None), 0.79);
        assert!(similarity(&a, &b, None) < 0.80);
    }

    #[test]
    fn test_synonym_boost_crosses_threshold() {
        let table = SynonymTable::default();
        let a = "setup billing account";
        let b = "configure billing account";

        let raw = similarity(a, b, None);
        assert!(raw < 0.80, "raw similarity should be under threshold, got {}", raw);

        let boosted = similarity(a, b, Some(&table));
        assert!(boosted >= 0.80, "boosted similarity should cross, got {}", boosted);
        assert_eq!(boosted, raw + SYNONYM_BOOST);
    }

    #[test]
    fn test_synonym_groups_are_a_partition() {
        let table = SynonymTable::default();
        assert_eq!(table.group_of("setup"), table.group_of("configure"));
        assert_ne!(table.group_of("setup"), table.group_of("review"));
        assert_eq!(table.group_of("not a verb"), None);
        assert!(table.share_group("setup the vpn", "initialize the vpn"));
        assert!(!table.share_group("setup the vpn", "review the vpn"));
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        // Both records are above the threshold; the newest-first order
        // means the first one is reported and iteration stops there.
        let store = Arc::new(FixedStore::new(vec![
            stored("newer", "send the q3 deck"),
            stored("older", "send the q3 deck"),
        ]));
        let detector = DuplicateDetector::new(store, DedupConfig::default());

        let verdict = detector.check(&task("Send the Q3 deck"), None).await;
        assert!(verdict.is_duplicate);
        assert_eq!(verdict.matched.unwrap().id, "newer");
    }

    #[tokio::test]
    async fn test_no_match_below_threshold() {
        let store = Arc::new(FixedStore::new(vec![stored(
            "t1",
            "water the office plants",
        )]));
        let detector = DuplicateDetector::new(store, DedupConfig::default());

        let verdict = detector.check(&task("Send the Q3 deck"), None).await;
        assert!(!verdict.is_duplicate);
        assert!(verdict.matched.is_none());
    }

    #[tokio::test]
    async fn test_verdict_cached_either_way() {
        let store = Arc::new(FixedStore::new(vec![]));
        let detector = DuplicateDetector::new(store.clone(), DedupConfig::default());

        let candidate = task("Send the Q3 deck");
        detector.check(&candidate, None).await;
        detector.check(&candidate, None).await;

        // Second check is served from the cache, no second fetch.
        assert_eq!(*store.calls.lock().unwrap(), 1);
        assert_eq!(detector.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_boost_disabled_by_config() {
        let store = Arc::new(FixedStore::new(vec![stored(
            "t1",
            "configure billing account",
        )]));
        let config = DedupConfig {
            synonym_boost: false,
            ..Default::default()
        };
        let detector = DuplicateDetector::new(store.clone(), config);
        let verdict = detector.check(&task("Setup billing account"), None).await;
        assert!(!verdict.is_duplicate);

        let detector = DuplicateDetector::new(store, DedupConfig::default());
        let verdict = detector.check(&task("Setup billing account"), None).await;
        assert!(verdict.is_duplicate);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_a_duplicate() {
        struct FailingStore;
        #[async_trait]
        impl EntityStore for FailingStore {
            async fn recent(&self, _f: &RecentFilter) -> SiftResult<Vec<StoredEntity>> {
                Err(crate::error::SiftError::store("db locked"))
            }
            async fn insert_task(&self, _t: &crate::types::TaskRecord) -> SiftResult<()> {
                Ok(())
            }
            async fn insert_event(&self, _e: &crate::types::EventRecord) -> SiftResult<()> {
                Ok(())
            }
            async fn insert_narrative(
                &self,
                _n: &crate::types::NarrativeRecord,
            ) -> SiftResult<()> {
                Ok(())
            }
        }

        let detector = DuplicateDetector::new(Arc::new(FailingStore), DedupConfig::default());
        let verdict = detector.check(&task("Send the Q3 deck"), None).await;
        assert!(!verdict.is_duplicate);
    }
}
