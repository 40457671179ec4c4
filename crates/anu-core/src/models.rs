use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Opaque identifier of a fetchable resource (absolute or site-relative URL).
///
/// Equality is exact string equality; no normalization is performed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceLocator(String);

impl ResourceLocator {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceLocator {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ResourceLocator {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ResourceLocator {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Image reference attached to a course or module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

/// A node of the content graph that maps to a fetchable page.
pub trait ContentNode {
    /// Site-relative path of the node's page (without language prefix).
    fn path(&self) -> &str;

    /// Image to cache alongside the page, if any.
    ///
    /// Images without a URL are treated as absent.
    fn image(&self) -> Option<&Image> {
        None
    }

    fn image_locator(&self) -> Option<ResourceLocator> {
        self.image()
            .filter(|image| !image.url.is_empty())
            .map(|image| ResourceLocator::new(image.url.clone()))
    }
}

/// A course as produced by the content transform layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: String,
    pub path: String,
    #[serde(default)]
    pub image: Option<Image>,
    #[serde(default)]
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: String,
    pub path: String,
    #[serde(default)]
    pub image: Option<Image>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub assessment: Option<Assessment>,
}

impl Course {
    /// Parse a course from the JSON produced by the content transform layer.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl Module {
    /// The module's assessment, if one is attached with an identifier.
    pub fn present_assessment(&self) -> Option<&Assessment> {
        self.assessment.as_ref().filter(|a| a.id.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: String,
    pub path: String,
}

impl ContentNode for Course {
    fn path(&self) -> &str {
        &self.path
    }

    fn image(&self) -> Option<&Image> {
        self.image.as_ref()
    }
}

impl ContentNode for Module {
    fn path(&self) -> &str {
        &self.path
    }

    fn image(&self) -> Option<&Image> {
        self.image.as_ref()
    }
}

impl ContentNode for Lesson {
    fn path(&self) -> &str {
        &self.path
    }
}

impl ContentNode for Assessment {
    fn path(&self) -> &str {
        &self.path
    }
}

/// A resource as returned by the network fetch primitive.
///
/// The status is recorded but never inspected: opaque responses count as
/// success as long as the transport completed. Cloning duplicates the body,
/// so one copy can be stored verbatim while the other is parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedResource {
    pub locator: ResourceLocator,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedResource {
    pub fn new(locator: ResourceLocator, body: impl Into<Vec<u8>>) -> Self {
        Self {
            locator,
            status: 200,
            content_type: None,
            body: body.into(),
        }
    }

    /// Consume the resource and decode its body as (lossy) UTF-8 text.
    pub fn into_text(self) -> String {
        match String::from_utf8(self.body) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

/// A resource persisted in a named durable cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    pub cache_name: String,
    pub locator: ResourceLocator,
    pub status: u16,
    pub content_type: Option<String>,
    #[serde(skip)]
    pub body: Vec<u8>,
    /// SHA-256 of the body
    pub content_hash: String,
    pub stored_at: DateTime<Utc>,
}

/// Compute a SHA-256 hash of a byte slice, returned as 64-char hex.
pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}
