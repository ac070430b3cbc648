//! Process-wide memoisation of loaded models.
//!
//! Loading a model downloads and maps its weights, so a pipeline builder asks
//! the cache first. Entries are keyed by model type plus an options/device key
//! and are read-only once inserted; callers receive clones that share the
//! underlying tensors.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Trait implemented by model option types to generate a stable cache key.
pub trait ModelOptions {
    fn cache_key(&self) -> String;
}

type CacheStorage = HashMap<(TypeId, String), Arc<dyn Any + Send + Sync>>;

pub struct ModelCache {
    entries: Mutex<CacheStorage>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached model for `key`, running `loader` on a miss.
    ///
    /// The lock is held while the loader runs so concurrent builders asking
    /// for the same model wait for the first load instead of repeating it.
    /// A failed load leaves no entry behind.
    pub async fn get_or_load<M, F, Fut>(&self, key: &str, loader: F) -> anyhow::Result<M>
    where
        M: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<M>>,
    {
        let cache_key = (TypeId::of::<M>(), key.to_string());
        let mut entries = self.entries.lock().await;

        if let Some(model) = entries
            .get(&cache_key)
            .and_then(|cached| cached.downcast_ref::<M>())
        {
            tracing::debug!(key, "model cache hit");
            return Ok(model.clone());
        }

        tracing::debug!(key, "model cache miss, loading");
        let model = loader().await?;
        entries.insert(cache_key, Arc::new(model.clone()) as Arc<dyn Any + Send + Sync>);
        Ok(model)
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_MODEL_CACHE: once_cell::sync::Lazy<ModelCache> =
    once_cell::sync::Lazy::new(ModelCache::new);

/// Get a reference to the global model cache.
pub fn global_cache() -> &'static ModelCache {
    &GLOBAL_MODEL_CACHE
}
