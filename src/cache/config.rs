//! Cache configuration and backend selection.

use std::sync::Arc;

use tracing::info;

use crate::config::{CacheBackend, CacheSettings};

use super::{
    redis::RedisStore,
    store::{KvStore, MemoryStore, StoreError},
};

/// Resolved cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: CacheBackend,
    pub redis_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Memory,
            redis_url: None,
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
        }
    }
}

impl CacheConfig {
    /// Build the configured store, or `None` when caching is turned off.
    ///
    /// Redis is pinged before returning so a bad URL fails startup.
    pub async fn build_store(&self) -> Result<Option<Arc<dyn KvStore>>, StoreError> {
        if !self.enabled {
            info!(target = "bookshelf::cache", "Cache disabled");
            return Ok(None);
        }

        let store: Arc<dyn KvStore> = match self.backend {
            CacheBackend::Memory => Arc::new(MemoryStore::new()),
            CacheBackend::Redis => {
                let url = self.redis_url.as_deref().ok_or_else(|| {
                    StoreError::Unavailable("redis backend selected without a url".to_string())
                })?;
                Arc::new(RedisStore::connect(url).await?)
            }
        };

        info!(
            target = "bookshelf::cache",
            backend = store.backend_name(),
            "Cache store ready"
        );
        Ok(Some(store))
    }
}
