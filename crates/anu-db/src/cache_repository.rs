use std::sync::Arc;

use anu_core::error::AppError;
use anu_core::models::{CacheEntry, FetchedResource, ResourceLocator, compute_hash};
use anu_core::traits::{CacheHandle, CacheStore};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};

/// Named caches persisted in PostgreSQL.
///
/// Every entry is keyed by `(cache_name, locator)`; storing the same locator
/// twice overwrites the previous response.
#[derive(Clone)]
pub struct CacheRepository {
    pool: Pool<Postgres>,
}

impl CacheRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace the entry for `resource.locator` in `cache_name`.
    pub async fn put(&self, cache_name: &str, resource: &FetchedResource) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO cache_entries (cache_name, locator, status, content_type, body, content_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (cache_name, locator) DO UPDATE SET
                status = EXCLUDED.status,
                content_type = EXCLUDED.content_type,
                body = EXCLUDED.body,
                content_hash = EXCLUDED.content_hash,
                stored_at = NOW()
            "#,
        )
        .bind(cache_name)
        .bind(resource.locator.as_str())
        .bind(i32::from(resource.status))
        .bind(resource.content_type.as_deref())
        .bind(&resource.body)
        .bind(compute_hash(&resource.body))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::StoreError(format!("Failed to store {}: {e}", resource.locator))
        })?;

        Ok(())
    }

    /// Fetch one stored entry.
    pub async fn get(
        &self,
        cache_name: &str,
        locator: &str,
    ) -> Result<Option<CacheEntry>, AppError> {
        let row = sqlx::query_as::<_, CacheEntryRow>(
            r#"
            SELECT cache_name, locator, status, content_type, body, content_hash, stored_at
            FROM cache_entries
            WHERE cache_name = $1 AND locator = $2
            "#,
        )
        .bind(cache_name)
        .bind(locator)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::StoreError(e.to_string()))?;

        row.map(CacheEntry::try_from).transpose()
    }

    /// All locators stored in `cache_name`, sorted.
    pub async fn keys(&self, cache_name: &str) -> Result<Vec<ResourceLocator>, AppError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT locator FROM cache_entries WHERE cache_name = $1 ORDER BY locator",
        )
        .bind(cache_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::StoreError(e.to_string()))?;

        Ok(rows.into_iter().map(|(l,)| ResourceLocator::new(l)).collect())
    }

    /// Delete every entry of `cache_name`. Returns the number of rows removed.
    pub async fn clear(&self, cache_name: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE cache_name = $1")
            .bind(cache_name)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::StoreError(e.to_string()))?;

        Ok(result.rows_affected())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::StoreError(e.to_string()))?;
        Ok(())
    }
}

impl CacheStore for CacheRepository {
    type Handle = PgCache;

    async fn open(&self, cache_name: &str) -> Result<PgCache, AppError> {
        if cache_name.trim().is_empty() {
            return Err(AppError::StoreError("cache name must not be empty".into()));
        }
        tracing::debug!(cache = cache_name, "Opened durable cache");
        Ok(PgCache {
            repo: self.clone(),
            name: Arc::from(cache_name),
        })
    }
}

/// Handle on one named cache in PostgreSQL.
#[derive(Clone)]
pub struct PgCache {
    repo: CacheRepository,
    name: Arc<str>,
}

impl PgCache {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl CacheHandle for PgCache {
    async fn put(&self, resource: &FetchedResource) -> Result<(), AppError> {
        self.repo.put(&self.name, resource).await
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct CacheEntryRow {
    cache_name: String,
    locator: String,
    status: i32,
    content_type: Option<String>,
    body: Vec<u8>,
    content_hash: String,
    stored_at: DateTime<Utc>,
}

impl TryFrom<CacheEntryRow> for CacheEntry {
    type Error = AppError;

    fn try_from(row: CacheEntryRow) -> Result<Self, Self::Error> {
        let status = u16::try_from(row.status).map_err(|_| {
            AppError::StoreError(format!(
                "Stored status {} for {} is out of range",
                row.status, row.locator
            ))
        })?;

        Ok(CacheEntry {
            cache_name: row.cache_name,
            locator: ResourceLocator::new(row.locator),
            status,
            content_type: row.content_type,
            body: row.body,
            content_hash: row.content_hash,
            stored_at: row.stored_at,
        })
    }
}
