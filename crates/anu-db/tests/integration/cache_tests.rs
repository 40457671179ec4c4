use anu_core::models::{FetchedResource, ResourceLocator, compute_hash};
use anu_core::traits::{CacheHandle, CacheStore};
use anu_db::{CacheRepository, Database};

use crate::integration::common::setup_test_db;

fn page(locator: &str, body: &str) -> FetchedResource {
    let mut resource = FetchedResource::new(locator.into(), body);
    resource.content_type = Some("text/html; charset=utf-8".into());
    resource
}

#[tokio::test]
async fn put_and_get_entry() {
    let (pool, _container) = setup_test_db().await;
    let repo = CacheRepository::new(pool);

    repo.put("course-v1", &page("/course/intro", "<html>intro</html>"))
        .await
        .unwrap();

    let entry = repo
        .get("course-v1", "/course/intro")
        .await
        .unwrap()
        .expect("entry should be stored");
    assert_eq!(entry.cache_name, "course-v1");
    assert_eq!(entry.locator.as_str(), "/course/intro");
    assert_eq!(entry.status, 200);
    assert_eq!(entry.content_type.as_deref(), Some("text/html; charset=utf-8"));
    assert_eq!(entry.body, b"<html>intro</html>");
    assert_eq!(entry.content_hash, compute_hash(b"<html>intro</html>"));
}

#[tokio::test]
async fn put_overwrites_existing_locator() {
    let (pool, _container) = setup_test_db().await;
    let repo = CacheRepository::new(pool);

    repo.put("course-v1", &page("/", "old")).await.unwrap();
    let mut error_page = page("/", "new");
    error_page.status = 503;
    repo.put("course-v1", &error_page).await.unwrap();

    let entry = repo.get("course-v1", "/").await.unwrap().unwrap();
    assert_eq!(entry.body, b"new");
    assert_eq!(entry.status, 503);
    assert_eq!(repo.keys("course-v1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn caches_are_isolated_by_name() {
    let (pool, _container) = setup_test_db().await;
    let repo = CacheRepository::new(pool);

    repo.put("v1", &page("/a", "a")).await.unwrap();
    repo.put("v2", &page("/b", "b")).await.unwrap();

    assert_eq!(repo.keys("v1").await.unwrap(), vec![ResourceLocator::from("/a")]);
    assert!(repo.get("v1", "/b").await.unwrap().is_none());
}

#[tokio::test]
async fn handle_writes_through_cache_store() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);
    let repo = db.cache_repo();

    let cache = repo.open("offline").await.unwrap();
    assert_eq!(cache.name(), "offline");
    cache.put(&page("/courses", "listing")).await.unwrap();
    cache.put(&page("/img/a.png", "png")).await.unwrap();

    let keys = repo.keys("offline").await.unwrap();
    assert_eq!(
        keys,
        vec![ResourceLocator::from("/courses"), ResourceLocator::from("/img/a.png")]
    );
}

#[tokio::test]
async fn clear_removes_only_named_cache() {
    let (pool, _container) = setup_test_db().await;
    let repo = CacheRepository::new(pool);

    repo.put("old", &page("/a", "a")).await.unwrap();
    repo.put("old", &page("/b", "b")).await.unwrap();
    repo.put("current", &page("/a", "a")).await.unwrap();

    assert_eq!(repo.clear("old").await.unwrap(), 2);
    assert!(repo.keys("old").await.unwrap().is_empty());
    assert_eq!(repo.keys("current").await.unwrap().len(), 1);
}

#[tokio::test]
async fn open_rejects_empty_name() {
    let (pool, _container) = setup_test_db().await;
    let repo = CacheRepository::new(pool);
    assert!(repo.open("  ").await.is_err());
    repo.health_check().await.unwrap();
}
