//! Run-scoped memoization of facet outcomes.
//!
//! Entries are created on first miss and never replaced or evicted; the
//! cache lives exactly as long as one run.

use std::collections::HashMap;
use std::future::Future;

use sha2::{Digest, Sha256};
use tracing::trace;

use lessonpath_shared::ProficiencyLevel;

/// Unit separator between key components, so `("a_b", "c")` and `("a", "b_c")` differ.
const PART_SEPARATOR: u8 = 0x1f;

/// Which enrichment facet a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Topic,
    Prerequisites,
}

impl Facet {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Prerequisites => "prerequisites",
        }
    }
}

/// Composite identity of the semantic inputs to one extraction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    facet: Facet,
    digest: String,
}

impl CacheKey {
    /// Key for the topic facet: (title, domain).
    pub fn topic(title: &str, domain: &str) -> Self {
        Self::from_parts(Facet::Topic, &[title, domain])
    }

    /// Key for the prerequisites facet: (title, domain, level).
    pub fn prerequisites(title: &str, domain: &str, level: ProficiencyLevel) -> Self {
        Self::from_parts(Facet::Prerequisites, &[title, domain, level.as_str()])
    }

    pub fn facet(&self) -> Facet {
        self.facet
    }

    fn from_parts(facet: Facet, parts: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(facet.as_str().as_bytes());
        for part in parts {
            hasher.update([PART_SEPARATOR]);
            hasher.update(part.as_bytes());
        }
        Self {
            facet,
            digest: format!("{:x}", hasher.finalize()),
        }
    }
}

/// Result of a cache lookup, tagged with whether compute ran.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    Hit(V),
    Miss(V),
}

impl<V> Lookup<V> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    pub fn into_value(self) -> V {
        match self {
            Self::Hit(v) | Self::Miss(v) => v,
        }
    }
}

/// In-memory memo table keyed by [`CacheKey`].
#[derive(Debug)]
pub struct EnrichmentCache<V> {
    entries: HashMap<CacheKey, V>,
    hits: usize,
    misses: usize,
}

impl<V> Default for EnrichmentCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }
}

impl<V: Clone> EnrichmentCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the stored value for `key`, or run `compute`, store its result, and return it.
    ///
    /// `compute` is never invoked for a key that is already present.
    pub async fn get_or_compute<F, Fut>(&mut self, key: CacheKey, compute: F) -> Lookup<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(value) = self.entries.get(&key) {
            self.hits += 1;
            trace!(facet = key.facet().as_str(), "cache hit");
            return Lookup::Hit(value.clone());
        }

        let value = compute().await;
        self.misses += 1;
        trace!(facet = key.facet().as_str(), entries = self.entries.len() + 1, "cache miss stored");
        self.entries.insert(key, value.clone());
        Lookup::Miss(value)
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn key_deterministic() {
        assert_eq!(
            CacheKey::topic("Learn Rust", "systems"),
            CacheKey::topic("Learn Rust", "systems")
        );
    }

    #[test]
    fn key_differs_by_facet_and_level() {
        let topic = CacheKey::topic("T", "d");
        let beginner = CacheKey::prerequisites("T", "d", ProficiencyLevel::Beginner);
        let advanced = CacheKey::prerequisites("T", "d", ProficiencyLevel::Advanced);
        assert_ne!(beginner, advanced);
        assert_ne!(topic.facet(), beginner.facet());
    }

    #[test]
    fn key_parts_do_not_run_together() {
        assert_ne!(CacheKey::topic("a_b", "c"), CacheKey::topic("a", "b_c"));
    }

    #[tokio::test]
    async fn compute_runs_at_most_once_per_key() {
        let mut cache = EnrichmentCache::new();
        let counter = Cell::new(0);
        let calls = &counter;
        let key = CacheKey::topic("Learn Python Variables", "python_programming");

        let first = cache
            .get_or_compute(key.clone(), || async move {
                calls.set(calls.get() + 1);
                "python_variables".to_string()
            })
            .await;
        assert!(!first.is_hit());

        for _ in 0..5 {
            let again = cache
                .get_or_compute(key.clone(), || async move {
                    calls.set(calls.get() + 1);
                    "something_else".to_string()
                })
                .await;
            assert!(again.is_hit());
            assert_eq!(again.into_value(), "python_variables");
        }

        assert_eq!(counter.get(), 1);
        assert_eq!(cache.hits(), 5);
        assert_eq!(cache.misses(), 1);
    }

    #[tokio::test]
    async fn distinct_keys_compute_separately() {
        let mut cache: EnrichmentCache<Vec<String>> = EnrichmentCache::new();
        let a = CacheKey::prerequisites("T", "d", ProficiencyLevel::Beginner);
        let b = CacheKey::prerequisites("T", "d", ProficiencyLevel::Advanced);

        cache.get_or_compute(a.clone(), || async { vec![] }).await;
        cache
            .get_or_compute(b.clone(), || async { vec!["x".to_string()] })
            .await;

        let stored_a = cache.get_or_compute(a, || async { vec!["y".to_string()] }).await;
        let stored_b = cache.get_or_compute(b, || async { vec!["y".to_string()] }).await;
        assert_eq!(stored_a, Lookup::Hit(vec![]));
        assert_eq!(stored_b, Lookup::Hit(vec!["x".to_string()]));
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.hits(), 2);
    }
}
