use std::time::Duration;

use anu_core::error::AppError;
use anu_core::models::{FetchedResource, ResourceLocator};
use anu_core::traits::Fetcher;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use url::Url;

/// HTTP fetcher using reqwest.
///
/// Requests are treated as opaque: any completed response is returned as-is,
/// whatever its status. Only transport failures (DNS, refused connection,
/// timeout, truncated body) become [`AppError::NetworkError`].
///
/// Site-relative locators are resolved against the configured base URL; the
/// returned resource keeps the original locator so cache keys stay exact.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    base_url: Option<Url>,
}

impl ReqwestFetcher {
    /// Fetcher without a request timeout.
    pub fn new() -> Result<Self, AppError> {
        Self::build(None)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> Result<Self, AppError> {
        let mut builder = Client::builder().user_agent("Anu/0.1 (offline prefetch)");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: None,
        })
    }

    /// Resolve site-relative locators against `base_url`.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, AppError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| AppError::ConfigError(format!("Invalid base URL '{base_url}': {e}")))?;
        self.base_url = Some(parsed);
        Ok(self)
    }

    fn resolve(&self, locator: &ResourceLocator) -> Result<Url, AppError> {
        if let Ok(absolute) = Url::parse(locator.as_str()) {
            return Ok(absolute);
        }

        let base = self.base_url.as_ref().ok_or_else(|| {
            AppError::ConfigError(format!("Relative locator '{locator}' needs a base URL"))
        })?;
        base.join(locator.as_str())
            .map_err(|e| AppError::ConfigError(format!("Cannot resolve '{locator}': {e}")))
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, locator: &ResourceLocator) -> Result<FetchedResource, AppError> {
        let url = self.resolve(locator)?;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::NetworkError(format!("Request timed out for {locator}: {e}"))
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed for {locator}: {e}"))
            } else {
                AppError::NetworkError(format!("Request failed for {locator}: {e}"))
            }
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| {
            AppError::NetworkError(format!("Failed to read response body for {locator}: {e}"))
        })?;

        if status >= 400 {
            tracing::debug!(%locator, %status, "Caching non-success response");
        }

        Ok(FetchedResource {
            locator: locator.clone(),
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}
