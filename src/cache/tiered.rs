//! # Tiered Cache
//!
//! Two-tier read cache in front of the data sources. The override tier
//! holds operator-pinned values with no expiry and always wins; the TTL
//! tier holds fetched results that age out. Lookups fall through
//! override, then TTL, then the caller's compute function.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::CacheSettings;
use crate::source::SourceError;

/// One TTL-tier entry. Expiry is evaluated lazily on read and by the
/// background sweeper.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }
}

/// Counter snapshot for the health surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheStats {
    pub override_entries: usize,
    /// TTL-tier entries, including expired ones not yet swept.
    pub ttl_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Concurrent two-tier cache keyed by lookup key strings.
#[derive(Debug)]
pub struct TieredCache {
    override_tier: DashMap<String, Value>,
    ttl_tier: DashMap<String, CacheEntry>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl TieredCache {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            override_tier: DashMap::new(),
            ttl_tier: DashMap::new(),
            default_ttl: settings.default_ttl(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Checks the override tier, then the TTL tier. Expired TTL entries
    /// are removed on the way through and count as misses.
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(pinned) = self.override_tier.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(pinned.value().clone());
        }

        let expired = match self.ttl_tier.get(key) {
            Some(entry) => {
                if entry.is_expired() {
                    true
                } else {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.value.clone());
                }
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        // read guard is released before removing
        if expired && self.ttl_tier.remove_if(key, |_, entry| entry.is_expired()).is_some() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores in the TTL tier with the configured default TTL.
    pub fn put(&self, key: impl Into<String>, value: Value) {
        self.put_with_ttl(key, value, self.default_ttl);
    }

    pub fn put_with_ttl(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        self.ttl_tier.insert(
            key.into(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Pins a value in the override tier. Pinned values never expire and
    /// shadow anything in the TTL tier.
    pub fn put_override(&self, key: impl Into<String>, value: Value) {
        self.override_tier.insert(key.into(), value);
    }

    pub fn remove_override(&self, key: &str) -> Option<Value> {
        self.override_tier.remove(key).map(|(_, value)| value)
    }

    /// Returns the cached value or runs `compute`, storing its result
    /// under the default TTL. Compute errors propagate and nothing is
    /// cached for them.
    pub async fn fetch_or_compute<F, Fut>(
        &self,
        key: &str,
        compute: F,
    ) -> Result<Value, SourceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, SourceError>>,
    {
        self.fetch_or_compute_with_ttl(key, self.default_ttl, compute)
            .await
    }

    pub async fn fetch_or_compute_with_ttl<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<Value, SourceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, SourceError>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = compute().await?;
        self.put_with_ttl(key, value.clone(), ttl);
        Ok(value)
    }

    /// Like [`fetch_or_compute`](TieredCache::fetch_or_compute) but
    /// absorbs compute failures into a null value. Nothing is cached on
    /// failure, so the next call computes again.
    pub async fn fetch_or_default<F, Fut>(&self, key: &str, compute: F) -> Value
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, SourceError>>,
    {
        match self.fetch_or_compute(key, compute).await {
            Ok(value) => value,
            Err(error) => {
                debug!(key, error = %error, "Compute failed, serving null default");
                Value::Null
            }
        }
    }

    /// Drops every entry in both tiers.
    pub fn invalidate_all(&self) {
        let dropped = self.override_tier.len() + self.ttl_tier.len();
        self.override_tier.clear();
        self.ttl_tier.clear();
        debug!(dropped, "Cache fully invalidated");
    }

    /// Removes TTL-tier entries whose key contains `pattern` as a
    /// substring. Override-tier pins are untouched. Returns the number
    /// of entries removed.
    pub fn invalidate_by_pattern(&self, pattern: &str) -> usize {
        let matching: Vec<String> = self
            .ttl_tier
            .iter()
            .filter(|entry| entry.key().contains(pattern))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in matching {
            if self.ttl_tier.remove(&key).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(pattern, removed, "Invalidated cache entries by pattern");
        }
        removed
    }

    /// Removes expired TTL-tier entries. Called periodically by the
    /// sweeper so reads do not bear the whole cleanup cost.
    pub fn sweep_expired(&self) -> usize {
        let candidates: Vec<String> = self
            .ttl_tier
            .iter()
            .filter(|entry| entry.value().is_expired())
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in candidates {
            // re-check under the entry lock; a concurrent put may have
            // refreshed the key since the scan
            if self
                .ttl_tier
                .remove_if(&key, |_, entry| entry.is_expired())
                .is_some()
            {
                removed += 1;
            }
        }
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "🧹 Swept expired cache entries");
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            override_entries: self.override_tier.len(),
            ttl_entries: self.ttl_tier.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
