//! Processed-query cache.
//!
//! moka TinyLFU cache with a per-entry TTL. Lives only in memory and is owned
//! by the [`super::QueryProcessor`].

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use super::QueryContext;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    raw_text: String,
    game_id: Option<String>,
}

impl CacheKey {
    fn new(raw_text: &str, game_id: Option<&str>) -> Self {
        Self {
            raw_text: raw_text.to_string(),
            game_id: game_id.map(str::to_string),
        }
    }
}

/// Cache of processed queries keyed by `(raw_text, game_id)`.
pub struct QueryCache {
    cache: Cache<CacheKey, Arc<QueryContext>>,
}

impl QueryCache {
    /// Create a cache holding at most `max_entries` for `ttl` each.
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub fn get(&self, raw_text: &str, game_id: Option<&str>) -> Option<Arc<QueryContext>> {
        self.cache.get(&CacheKey::new(raw_text, game_id))
    }

    /// Insert unless an entry already exists; returns the cached value.
    ///
    /// When two tasks process the same query concurrently, the first insert
    /// wins and both callers end up with the same context.
    pub fn insert_if_absent(&self, ctx: Arc<QueryContext>) -> Arc<QueryContext> {
        let key = CacheKey::new(&ctx.raw_text, ctx.game_id.as_deref());
        self.cache.entry(key).or_insert(ctx).into_value()
    }

    /// Number of entries currently in the cache.
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}
