use std::future::Future;

use crate::document::LessonDocument;
use crate::error::AppError;
use crate::models::{FetchedResource, ResourceLocator};

/// Network fetch primitive.
///
/// Requests are opaque: a request that completes counts as success whatever
/// its HTTP status. Only transport failures are reported, as
/// [`AppError::NetworkError`].
pub trait Fetcher: Send + Sync + Clone + 'static {
    fn fetch(
        &self,
        locator: &ResourceLocator,
    ) -> impl Future<Output = Result<FetchedResource, AppError>> + Send;
}

/// Extracts the image locators referenced by a fetched lesson or assessment page.
pub trait ResourceExtractor: Send + Sync + Clone + 'static {
    /// Fails with [`AppError::MalformedPage`] when the page carries no
    /// readable structured-data block.
    fn extract_image_locators(&self, page: &str) -> Result<Vec<ResourceLocator>, AppError>;
}

/// Picks the current node out of a page's settings JSON.
pub trait NodeResolver: Send + Sync + Clone + 'static {
    fn resolve(&self, settings: &serde_json::Value) -> Result<LessonDocument, AppError>;
}

/// Durable key-value store of named caches.
pub trait CacheStore: Send + Sync + Clone + 'static {
    type Handle: CacheHandle;

    /// Open (creating if needed) the cache with the given name.
    fn open(&self, cache_name: &str) -> impl Future<Output = Result<Self::Handle, AppError>> + Send;
}

/// A single opened cache.
pub trait CacheHandle: Send + Sync + Clone + 'static {
    /// Store a resource under its locator, overwriting any previous entry.
    fn put(&self, resource: &FetchedResource) -> impl Future<Output = Result<(), AppError>> + Send;
}
