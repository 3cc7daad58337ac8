//! Group lookup cache
//!
//! Entries are keyed by (group code, filter, requested attributes) and never
//! expire on their own. Invalidation works per group code and drops every
//! filter/attribute variant cached for that code.
//!
//! Every invalidation also advances the code's generation. A lookup reads the
//! generation before it searches and hands it back to
//! [`GroupCache::insert`], which refuses results from a search that raced
//! with an invalidation.

use dirgroup_core::{DirectoryEntry, Filter};
use metrics::counter;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

const CACHE_HITS_TOTAL: &str = "dirgroup_cache_hits_total";
const CACHE_MISSES_TOTAL: &str = "dirgroup_cache_misses_total";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub code: String,
    pub filter: Filter,
    pub attributes: Vec<String>,
}

impl CacheKey {
    pub fn new(code: &str, filter: &Filter, attributes: &[String]) -> Self {
        Self {
            code: code.to_string(),
            filter: filter.clone(),
            attributes: attributes.to_vec(),
        }
    }
}

/// Point in a code's invalidation history, taken before a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, Vec<DirectoryEntry>>,
    /// Last invalidation of each code
    generations: HashMap<String, u64>,
    /// Last full clear
    cleared: u64,
    counter: u64,
}

impl CacheState {
    fn generation(&self, code: &str) -> Generation {
        let invalidated = self.generations.get(code).copied().unwrap_or(0);
        Generation(invalidated.max(self.cleared))
    }
}

#[derive(Debug, Default)]
pub struct GroupCache {
    state: RwLock<CacheState>,
}

impl GroupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Vec<DirectoryEntry>> {
        let state = self.state.read().await;

        match state.entries.get(key) {
            Some(result) => {
                counter!(CACHE_HITS_TOTAL).increment(1);
                Some(result.clone())
            }
            None => {
                counter!(CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Current generation of `code`; read it before searching
    pub async fn generation(&self, code: &str) -> Generation {
        self.state.read().await.generation(code)
    }

    /// Store `result` unless `code` was invalidated after `generation` was
    /// taken. Returns whether the result was stored.
    pub async fn insert(
        &self,
        key: CacheKey,
        result: Vec<DirectoryEntry>,
        generation: Generation,
    ) -> bool {
        let mut state = self.state.write().await;

        if state.generation(&key.code) != generation {
            debug!(code = %key.code, "Discarding lookup that raced an invalidation");
            return false;
        }

        state.entries.insert(key, result);
        true
    }

    /// Drop every entry cached for `code`, returning how many were removed
    pub async fn invalidate(&self, code: &str) -> usize {
        let mut state = self.state.write().await;
        state.counter += 1;
        let counter = state.counter;
        state.generations.insert(code.to_string(), counter);

        let before = state.entries.len();
        state.entries.retain(|key, _| key.code != code);

        let removed = before - state.entries.len();
        debug!(code, removed, "Invalidated group cache");
        removed
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.counter += 1;
        state.cleared = state.counter;
        state.generations.clear();
        state.entries.clear();
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(dn: &str) -> Vec<DirectoryEntry> {
        vec![DirectoryEntry::new(dn)]
    }

    async fn store(cache: &GroupCache, key: CacheKey, dn: &str) {
        let generation = cache.generation(&key.code).await;
        assert!(cache.insert(key, result(dn), generation).await);
    }

    #[tokio::test]
    async fn test_get_and_insert() {
        let cache = GroupCache::new();
        let key = CacheKey::new("eng", &Filter::group_named("eng"), &["member".to_string()]);

        assert!(cache.get(&key).await.is_none());
        store(&cache, key.clone(), "cn=eng").await;
        assert_eq!(cache.get(&key).await, Some(result("cn=eng")));
    }

    #[tokio::test]
    async fn test_attributes_are_part_of_key() {
        let cache = GroupCache::new();
        let filter = Filter::group_named("eng");
        store(&cache, CacheKey::new("eng", &filter, &["member".to_string()]), "cn=eng").await;

        let other = CacheKey::new("eng", &filter, &["owner".to_string()]);
        assert!(cache.get(&other).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_drops_every_variant_for_code() {
        let cache = GroupCache::new();
        let filter = Filter::group_named("eng");
        store(&cache, CacheKey::new("eng", &filter, &["member".to_string()]), "cn=eng").await;
        store(&cache, CacheKey::new("eng", &filter, &["owner".to_string()]), "cn=eng").await;
        store(
            &cache,
            CacheKey::new("ops", &Filter::group_named("ops"), &["member".to_string()]),
            "cn=ops",
        )
        .await;

        assert_eq!(cache.invalidate("eng").await, 2);
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_insert_skips_result_older_than_invalidation() {
        let cache = GroupCache::new();
        let key = CacheKey::new("eng", &Filter::group_named("eng"), &["member".to_string()]);

        let before = cache.generation("eng").await;
        cache.invalidate("eng").await;
        assert!(!cache.insert(key.clone(), result("cn=eng"), before).await);
        assert!(cache.get(&key).await.is_none());

        // Other codes keep their generation
        let ops = CacheKey::new("ops", &Filter::group_named("ops"), &["member".to_string()]);
        assert!(cache.insert(ops, result("cn=ops"), before).await);

        let after = cache.generation("eng").await;
        assert!(after > before);
        assert!(cache.insert(key, result("cn=eng"), after).await);
    }

    #[tokio::test]
    async fn test_clear_advances_every_generation() {
        let cache = GroupCache::new();
        let key = CacheKey::new("eng", &Filter::group_named("eng"), &["member".to_string()]);

        let before = cache.generation("eng").await;
        cache.clear().await;
        assert!(!cache.insert(key, result("cn=eng"), before).await);
        assert!(cache.is_empty().await);
    }
}
