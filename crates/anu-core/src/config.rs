use crate::error::AppError;
use crate::models::ResourceLocator;

/// Settings for a prefetch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchConfig {
    /// Name of the durable cache to populate (the `current_cache` setting).
    pub cache_name: String,
    /// Active language path prefix, e.g. `/fr`. Empty for the default language.
    pub lang_prefix: String,
    pub home_path: String,
    pub listing_path: String,
    /// Upper bound on in-flight fetches per batch. `None` means unbounded.
    pub max_concurrency: Option<usize>,
}

impl PrefetchConfig {
    pub fn new(cache_name: impl Into<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            lang_prefix: String::new(),
            home_path: "/".to_string(),
            listing_path: "/courses".to_string(),
            max_concurrency: None,
        }
    }

    /// Read configuration from environment variables.
    ///
    /// - `ANU_CURRENT_CACHE` (required)
    /// - `ANU_LANG_PREFIX` (optional, defaults to empty)
    /// - `ANU_HOME_PATH` (optional, defaults to `/`)
    /// - `ANU_LISTING_PATH` (optional, defaults to `/courses`)
    /// - `ANU_MAX_CONCURRENCY` (optional, unbounded when unset)
    pub fn from_env() -> Result<Self, AppError> {
        let cache_name = std::env::var("ANU_CURRENT_CACHE").map_err(|_| {
            AppError::ConfigError("ANU_CURRENT_CACHE not set. Required to open the cache.".into())
        })?;

        let mut config = Self::new(cache_name);
        if let Ok(prefix) = std::env::var("ANU_LANG_PREFIX") {
            config = config.with_lang_prefix(prefix);
        }
        if let Ok(path) = std::env::var("ANU_HOME_PATH") {
            config.home_path = path;
        }
        if let Ok(path) = std::env::var("ANU_LISTING_PATH") {
            config.listing_path = path;
        }
        if let Ok(raw) = std::env::var("ANU_MAX_CONCURRENCY") {
            config.max_concurrency = Some(parse_max_concurrency(&raw)?);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_lang_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.lang_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_concurrency(mut self, limit: Option<usize>) -> Self {
        self.max_concurrency = limit;
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.cache_name.trim().is_empty() {
            return Err(AppError::ConfigError("cache name must not be empty".into()));
        }
        if self.max_concurrency == Some(0) {
            return Err(AppError::ConfigError(
                "max concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Apply the language prefix to a content path.
    pub fn localize(&self, path: &str) -> ResourceLocator {
        ResourceLocator::new(format!("{}{}", self.lang_prefix, path))
    }

    pub fn home_locator(&self) -> ResourceLocator {
        self.localize(&self.home_path)
    }

    pub fn listing_locator(&self) -> ResourceLocator {
        self.localize(&self.listing_path)
    }
}

pub fn parse_max_concurrency(raw: &str) -> Result<usize, AppError> {
    let parsed: usize = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!(
            "Invalid ANU_MAX_CONCURRENCY '{raw}': must be a positive integer"
        ))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(
            "ANU_MAX_CONCURRENCY must be at least 1".into(),
        ));
    }
    Ok(parsed)
}
