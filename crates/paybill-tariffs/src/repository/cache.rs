//! Rule cache decorator
//!
//! Memoizes `fetch_rules` per scope in front of a slower repository. Writers
//! are expected to call [`CachedRuleRepository::invalidate`] for every scope
//! they touch; entries never expire on their own.
//!
//! Each key carries a generation bumped by `invalidate` and `clear`. A miss
//! stores its result only if the generation it started under is still
//! current, so a read racing a write cannot repopulate the cache with the
//! pre-write rules.

use super::RuleRepository;
use async_trait::async_trait;
use dashmap::DashMap;
use paybill_common::{CostRule, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Caching wrapper around any [`RuleRepository`]
pub struct CachedRuleRepository<R: CostRule> {
    inner: Arc<dyn RuleRepository<R>>,
    cache: DashMap<String, Arc<Vec<R>>>,
    generations: DashMap<String, u64>,
    prefix: String,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached scopes
    pub entry_count: u64,
    pub hits: u64,
    pub misses: u64,
}

impl<R: CostRule> CachedRuleRepository<R> {
    pub fn new(inner: Arc<dyn RuleRepository<R>>, max_entries: usize) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
            generations: DashMap::new(),
            prefix: "paybill:rules".to_string(),
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Create cache with custom key prefix
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Deterministic key for a scope; `None` if the scope cannot be encoded
    fn cache_key(&self, scope: &R::Scope) -> Option<String> {
        let encoded = match serde_json::to_vec(scope) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(kind = %R::KIND, "Unable to encode scope for cache key: {}", e);
                return None;
            }
        };
        let hash = blake3::hash(&encoded);
        Some(format!("{}:{}:{}", self.prefix, R::KIND, hash.to_hex()))
    }

    /// Drop the cached rules of one scope
    pub fn invalidate(&self, scope: &R::Scope) -> bool {
        let Some(key) = self.cache_key(scope) else {
            return false;
        };

        // Generation guard is held across the removal; lock order is
        // generations, then cache
        let mut generation = self.generations.entry(key.clone()).or_insert(0);
        *generation += 1;
        let removed = self.cache.remove(&key).is_some();
        drop(generation);

        debug!(kind = %R::KIND, removed, "Invalidated rule cache entry");
        removed
    }

    pub fn clear(&self) {
        for mut generation in self.generations.iter_mut() {
            *generation += 1;
        }
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.cache.len() as u64,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn store(&self, key: String, rules: Arc<Vec<R>>) {
        // Evict an arbitrary entry when at capacity
        if self.cache.len() >= self.max_entries && !self.cache.contains_key(&key) {
            let victim = self.cache.iter().next().map(|e| e.key().clone());
            if let Some(victim) = victim {
                self.cache.remove(&victim);
            }
        }
        self.cache.insert(key, rules);
    }
}

#[async_trait]
impl<R: CostRule> RuleRepository<R> for CachedRuleRepository<R> {
    #[instrument(skip(self), fields(kind = %R::KIND))]
    async fn fetch_rules(&self, scope: &R::Scope) -> Result<Vec<R>> {
        let Some(key) = self.cache_key(scope) else {
            return self.inner.fetch_rules(scope).await;
        };

        if let Some(rules) = self.cache.get(&key).map(|e| Arc::clone(e.value())) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache hit");
            return Ok(rules.as_ref().clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Cache miss");

        let started = *self.generations.entry(key.clone()).or_insert(0);
        let rules = self.inner.fetch_rules(scope).await?;

        let current = self.generations.entry(key.clone()).or_insert(0);
        if *current == started {
            self.store(key, Arc::new(rules.clone()));
        } else {
            debug!(key = %key, "Scope invalidated during fetch, result not cached");
        }
        drop(current);

        Ok(rules)
    }

    async fn fetch_rules_for_merchant(&self, merchant_id: Uuid) -> Result<Vec<R>> {
        self.inner.fetch_rules_for_merchant(merchant_id).await
    }
}
