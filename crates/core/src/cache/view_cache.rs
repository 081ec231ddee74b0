//! Read-view caching using Moka.
//!
//! Holds rendered list views so repeated reads skip the database. The cache is
//! never consulted for balance decisions; writers drop affected scopes right
//! after commit and readers may bypass it entirely.

use moka::sync::Cache;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::keys::{CacheKey, ViewKey};
use crate::effects::ViewInvalidator;

/// Default cache capacity (number of entries).
const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Default time-to-live for cache entries (10 minutes).
const DEFAULT_TTL_SECS: u64 = 600;

/// Cache of rendered read views.
///
/// Variants are indexed by scope so that a scope can be dropped with exact key
/// removals rather than a pattern sweep.
#[derive(Clone)]
pub struct ViewCache {
    cache: Cache<ViewKey, Arc<Value>>,
    variants: Arc<Mutex<HashMap<CacheKey, HashSet<String>>>>,
}

impl ViewCache {
    /// Creates a new view cache with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Creates a new view cache with custom configuration.
    ///
    /// # Arguments
    ///
    /// * `max_capacity` - Maximum number of entries to cache
    /// * `ttl_secs` - Time-to-live in seconds for each entry
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            cache,
            variants: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns a cached view.
    #[must_use]
    pub fn get(&self, key: &ViewKey) -> Option<Arc<Value>> {
        self.cache.get(key)
    }

    /// Stores a rendered view.
    pub fn insert(&self, key: ViewKey, value: Value) {
        self.variants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.scope)
            .or_default()
            .insert(key.variant.clone());
        self.cache.insert(key, Arc::new(value));
    }

    /// Drops every view of a scope.
    pub fn invalidate_scope(&self, scope: &CacheKey) {
        let variants = self
            .variants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(scope)
            .unwrap_or_default();

        tracing::debug!(%scope, views = variants.len(), "invalidating cached views");
        for variant in variants {
            self.cache.invalidate(&ViewKey::new(*scope, variant));
        }
    }

    /// Invalidates all cached entries.
    pub fn invalidate_all(&self) {
        self.variants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.cache.invalidate_all();
    }

    /// Returns the number of entries currently in the cache.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs cache maintenance tasks.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewInvalidator for ViewCache {
    fn invalidate(&self, scope: &CacheKey) {
        self.invalidate_scope(scope);
    }
}
