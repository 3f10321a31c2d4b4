mod key;
mod memory;

pub use key::CacheKey;
pub use memory::MemoryCache;

use crate::config::CacheConfig;

/// Fragment translation cache.
///
/// Repeated text (running heads, boilerplate, re-processed documents) skips
/// the network entirely. Entries live in memory for the duration of the run.
pub struct TranslationCache {
    memory: Option<MemoryCache>,
}

impl TranslationCache {
    /// Create a new translation cache from configuration
    pub fn new(config: &CacheConfig) -> Self {
        let memory = config
            .enabled
            .then(|| MemoryCache::new(config.max_entries, config.ttl_seconds));

        Self { memory }
    }

    /// Create a disabled cache (every lookup misses)
    pub const fn disabled() -> Self {
        Self { memory: None }
    }

    /// Get a cached translation
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        match self.memory {
            Some(ref memory) => memory.get(key.as_str()).await,
            None => None,
        }
    }

    /// Store a translation in cache
    pub async fn insert(&self, key: &CacheKey, value: String) {
        if let Some(ref memory) = self.memory {
            memory.insert(key.to_string(), value).await;
        }
    }

    /// Clear all cached entries
    pub fn clear(&self) {
        if let Some(ref memory) = self.memory {
            memory.clear();
        }
    }
}
