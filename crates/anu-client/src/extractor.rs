use anu_core::error::AppError;
use anu_core::models::ResourceLocator;
use anu_core::node::CurrentNodeResolver;
use anu_core::traits::{NodeResolver, ResourceExtractor};
use scraper::{Html, Selector};

/// Selector for the JSON settings block embedded in every rendered page.
const SETTINGS_SELECTOR: &str =
    r#"script[type="application/json"][data-drupal-selector="drupal-settings-json"]"#;

/// Extracts lesson and assessment images from a page's embedded settings JSON.
///
/// The first matching `<script>` block is parsed, the current node is picked
/// by the [`NodeResolver`], and its paragraphs are scanned for image fields.
#[derive(Clone)]
pub struct SettingsJsonExtractor<R = CurrentNodeResolver> {
    resolver: R,
    selector: Selector,
}

impl SettingsJsonExtractor<CurrentNodeResolver> {
    pub fn new() -> Result<Self, AppError> {
        Self::with_resolver(CurrentNodeResolver::new())
    }
}

impl<R: NodeResolver> SettingsJsonExtractor<R> {
    pub fn with_resolver(resolver: R) -> Result<Self, AppError> {
        let selector = Selector::parse(SETTINGS_SELECTOR)
            .map_err(|e| AppError::Generic(format!("Invalid settings selector: {e}")))?;
        Ok(Self { resolver, selector })
    }

    /// Parse the settings block of `page` into JSON.
    pub fn settings(&self, page: &str) -> Result<serde_json::Value, AppError> {
        let document = Html::parse_document(page);
        let block = document
            .select(&self.selector)
            .next()
            .ok_or_else(|| AppError::MalformedPage("settings JSON block not found".into()))?;

        let raw: String = block.text().collect();
        serde_json::from_str(&raw)
            .map_err(|e| AppError::MalformedPage(format!("settings JSON does not parse: {e}")))
    }
}

impl<R: NodeResolver> ResourceExtractor for SettingsJsonExtractor<R> {
    fn extract_image_locators(&self, page: &str) -> Result<Vec<ResourceLocator>, AppError> {
        let settings = self.settings(page)?;
        let document = self.resolver.resolve(&settings)?;
        Ok(document.image_locators())
    }
}
