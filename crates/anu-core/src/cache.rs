//! Fetch-and-store primitive plus an in-memory [`CacheStore`].

use std::sync::Arc;

use moka::future::Cache;

use crate::error::AppError;
use crate::models::{FetchedResource, ResourceLocator};
use crate::traits::{CacheHandle, CacheStore, Fetcher};

/// Fetches one locator and writes the untouched response into an opened cache.
#[derive(Clone)]
pub struct CacheWriter<F, H> {
    fetcher: F,
    cache: H,
}

impl<F, H> CacheWriter<F, H>
where
    F: Fetcher,
    H: CacheHandle,
{
    pub fn new(fetcher: F, cache: H) -> Self {
        Self { fetcher, cache }
    }

    /// Fetch `locator`, store a verbatim copy, and hand the response back so
    /// the caller may consume its body.
    pub async fn fetch_and_store(
        &self,
        locator: &ResourceLocator,
    ) -> Result<FetchedResource, AppError> {
        let response = self.fetcher.fetch(locator).await?;
        let stored = response.clone();
        self.cache.put(&stored).await?;
        tracing::debug!(%locator, bytes = stored.body.len(), "Stored resource");
        Ok(response)
    }
}

/// In-memory cache store backed by `moka`. Entries are never evicted.
#[derive(Clone)]
pub struct MemoryCacheStore {
    caches: Cache<String, MemoryCache>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self {
            caches: Cache::builder().build(),
        }
    }

    /// Look up an already opened cache without creating it.
    pub async fn cache(&self, cache_name: &str) -> Option<MemoryCache> {
        self.caches.get(cache_name).await
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryCacheStore {
    type Handle = MemoryCache;

    async fn open(&self, cache_name: &str) -> Result<MemoryCache, AppError> {
        let name = cache_name.to_string();
        Ok(self
            .caches
            .get_with(name.clone(), async move { MemoryCache::new(name) })
            .await)
    }
}

/// A named in-memory cache.
#[derive(Clone)]
pub struct MemoryCache {
    name: Arc<str>,
    entries: Cache<ResourceLocator, FetchedResource>,
}

impl MemoryCache {
    fn new(name: String) -> Self {
        Self {
            name: name.into(),
            entries: Cache::builder().build(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, locator: &ResourceLocator) -> bool {
        self.entries.contains_key(locator)
    }

    pub async fn get(&self, locator: &ResourceLocator) -> Option<FetchedResource> {
        self.entries.get(locator).await
    }

    /// Stored locators, sorted.
    pub fn keys(&self) -> Vec<ResourceLocator> {
        let mut keys: Vec<_> = self
            .entries
            .iter()
            .map(|(key, _)| ResourceLocator::clone(&key))
            .collect();
        keys.sort();
        keys
    }
}

impl CacheHandle for MemoryCache {
    async fn put(&self, resource: &FetchedResource) -> Result<(), AppError> {
        self.entries
            .insert(resource.locator.clone(), resource.clone())
            .await;
        Ok(())
    }
}
