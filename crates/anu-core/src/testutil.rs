//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::job::{PrefetchEvent, PrefetchReporter};
use crate::models::{Course, FetchedResource, Image, Lesson, Module, ResourceLocator};
use crate::traits::{CacheHandle, CacheStore, Fetcher, ResourceExtractor};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher serving configured bodies per locator.
///
/// Unknown locators answer with a default body; locators marked as failing
/// produce a `NetworkError`.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    pub requests: Arc<Mutex<Vec<ResourceLocator>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, locator: &str, body: &str) -> Self {
        self.set_page(locator, body);
        self
    }

    pub fn set_page(&self, locator: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(locator.to_string(), body.as_bytes().to_vec());
    }

    pub fn failing(self, locator: &str) -> Self {
        self.failing.lock().unwrap().insert(locator.to_string());
        self
    }

    pub fn with_delay(self, locator: &str, delay: Duration) -> Self {
        self.delays
            .lock()
            .unwrap()
            .insert(locator.to_string(), delay);
        self
    }

    pub fn requested(&self) -> Vec<ResourceLocator> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, locator: &ResourceLocator) -> Result<FetchedResource, AppError> {
        self.requests.lock().unwrap().push(locator.clone());

        let delay = self.delays.lock().unwrap().get(locator.as_str()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(locator.as_str()) {
            return Err(AppError::NetworkError(format!(
                "Connection failed: {locator}"
            )));
        }

        let body = self
            .pages
            .lock()
            .unwrap()
            .get(locator.as_str())
            .cloned()
            .unwrap_or_else(|| b"default".to_vec());
        Ok(FetchedResource::new(locator.clone(), body))
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor keyed by page body.
///
/// Unknown pages yield no images.
#[derive(Clone, Default)]
pub struct MockExtractor {
    pages: Arc<Mutex<HashMap<String, Result<Vec<ResourceLocator>, String>>>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_images(self, page: &str, images: &[&str]) -> Self {
        let images = images.iter().map(|i| ResourceLocator::from(*i)).collect();
        self.pages
            .lock()
            .unwrap()
            .insert(page.to_string(), Ok(images));
        self
    }

    pub fn malformed(self, page: &str) -> Self {
        self.pages.lock().unwrap().insert(
            page.to_string(),
            Err("structured-data block not found".to_string()),
        );
        self
    }
}

impl ResourceExtractor for MockExtractor {
    fn extract_image_locators(&self, page: &str) -> Result<Vec<ResourceLocator>, AppError> {
        match self.pages.lock().unwrap().get(page) {
            Some(Ok(images)) => Ok(images.clone()),
            Some(Err(message)) => Err(AppError::MalformedPage(message.clone())),
            None => Ok(vec![]),
        }
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// Mock cache store that records opens and writes.
///
/// The same value serves as store and handle.
#[derive(Clone, Default)]
pub struct MockStore {
    pub opened: Arc<Mutex<Vec<String>>>,
    pub puts: Arc<Mutex<Vec<ResourceLocator>>>,
    entries: Arc<Mutex<HashMap<ResourceLocator, Vec<u8>>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    open_error: Arc<Mutex<Option<AppError>>>,
}

impl MockStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Store whose writes for `locator` fail.
    pub fn failing_on(self, locator: &str) -> Self {
        self.failing.lock().unwrap().insert(locator.to_string());
        self
    }

    pub fn with_open_error(error: AppError) -> Self {
        let store = Self::default();
        *store.open_error.lock().unwrap() = Some(error);
        store
    }

    pub fn keys(&self) -> HashSet<ResourceLocator> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }

    pub fn body(&self, locator: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .unwrap()
            .get(&ResourceLocator::from(locator))
            .cloned()
    }
}

impl CacheStore for MockStore {
    type Handle = MockStore;

    async fn open(&self, cache_name: &str) -> Result<MockStore, AppError> {
        if let Some(e) = self.open_error.lock().unwrap().take() {
            return Err(e);
        }
        self.opened.lock().unwrap().push(cache_name.to_string());
        Ok(self.clone())
    }
}

impl CacheHandle for MockStore {
    async fn put(&self, resource: &FetchedResource) -> Result<(), AppError> {
        self.puts.lock().unwrap().push(resource.locator.clone());
        if self
            .failing
            .lock()
            .unwrap()
            .contains(resource.locator.as_str())
        {
            return Err(AppError::StoreError(format!(
                "quota exceeded writing {}",
                resource.locator
            )));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(resource.locator.clone(), resource.body.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock prefetch reporter that records event labels.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl PrefetchReporter for MockReporter {
    fn report(&self, event: PrefetchEvent<'_>) {
        let label = match &event {
            PrefetchEvent::Started { .. } => "Started".to_string(),
            PrefetchEvent::BatchStarted { stage, .. } => format!("BatchStarted:{stage}"),
            PrefetchEvent::ResourceStored { .. } => "ResourceStored".to_string(),
            PrefetchEvent::ImagesDiscovered { .. } => "ImagesDiscovered".to_string(),
            PrefetchEvent::BatchCompleted { stage, .. } => format!("BatchCompleted:{stage}"),
            PrefetchEvent::Succeeded { .. } => "Succeeded".to_string(),
            PrefetchEvent::Failed { .. } => "Failed".to_string(),
        };
        self.events.lock().unwrap().push(label);
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Course with one module (`/m1`, image `/img/m1.png`) holding one lesson `/l1`.
pub fn make_test_course() -> Course {
    Course {
        id: Some(1),
        title: "Test course".to_string(),
        path: "/course/test".to_string(),
        image: None,
        modules: vec![Module {
            id: Some(10),
            title: "Module 1".to_string(),
            path: "/m1".to_string(),
            image: Some(Image {
                url: "/img/m1.png".to_string(),
                alt: None,
            }),
            lessons: vec![Lesson {
                id: Some(100),
                title: "Lesson 1".to_string(),
                path: "/l1".to_string(),
            }],
            assessment: None,
        }],
    }
}

pub fn locators(values: &[&str]) -> HashSet<ResourceLocator> {
    values.iter().map(|v| ResourceLocator::from(*v)).collect()
}
