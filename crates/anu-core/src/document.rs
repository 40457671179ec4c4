//! Typed representation of a fetched lesson or assessment page.
//!
//! Pages embed their content as a JSON node. Only two node types carry
//! media: `module_lesson` (sections of paragraphs) and `module_assessment`
//! (a flat list of items). A field whose value is an object with
//! `type == "image"` and a string `url` is an image reference. Nothing
//! deeper than one level inside a paragraph is inspected.

use std::fmt;

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::models::ResourceLocator;

/// Parsed content of a lesson or assessment page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum LessonDocument {
    #[serde(rename = "module_lesson")]
    ModuleLesson {
        #[serde(default)]
        sections: Vec<Section>,
    },
    #[serde(rename = "module_assessment")]
    ModuleAssessment {
        #[serde(default)]
        items: Vec<Paragraph>,
    },
    /// Any other node type. Carries no extractable media.
    #[serde(other)]
    Other,
}

/// An ordered sequence of paragraphs.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(transparent)]
pub struct Section(pub Vec<Paragraph>);

/// Mapping of field name to field value, in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph(pub Vec<(String, FieldValue)>);

/// A single paragraph field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Image(ImageField),
    Other(serde_json::Value),
}

/// An image reference. Only JSON objects qualify; arrays never do.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageField {
    pub kind: ImageTag,
    pub url: String,
}

/// Discriminant accepted for image fields; only `"image"` matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ImageTag {
    #[serde(rename = "image")]
    Image,
}

impl<'de> Deserialize<'de> for ImageField {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ImageFieldVisitor;

        impl<'de> Visitor<'de> for ImageFieldVisitor {
            type Value = ImageField;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object with type \"image\" and a url")
            }

            fn visit_map<A>(self, mut map: A) -> Result<ImageField, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut kind = None;
                let mut url = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "type" => kind = Some(map.next_value::<ImageTag>()?),
                        "url" => url = Some(map.next_value::<String>()?),
                        _ => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(ImageField {
                    kind: kind.ok_or_else(|| de::Error::missing_field("type"))?,
                    url: url.ok_or_else(|| de::Error::missing_field("url"))?,
                })
            }
        }

        deserializer.deserialize_map(ImageFieldVisitor)
    }
}

impl<'de> Deserialize<'de> for Paragraph {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ParagraphVisitor;

        impl<'de> Visitor<'de> for ParagraphVisitor {
            type Value = Paragraph;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of paragraph fields")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Paragraph, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, value)) = map.next_entry::<String, FieldValue>()? {
                    fields.push((name, value));
                }
                Ok(Paragraph(fields))
            }
        }

        deserializer.deserialize_map(ParagraphVisitor)
    }
}

/// Walks a [`LessonDocument`] in document order.
pub trait DocumentVisitor {
    fn visit_field(&mut self, name: &str, value: &FieldValue);
}

impl Paragraph {
    pub fn walk<V: DocumentVisitor>(&self, visitor: &mut V) {
        for (name, value) in &self.0 {
            visitor.visit_field(name, value);
        }
    }
}

impl LessonDocument {
    pub fn walk<V: DocumentVisitor>(&self, visitor: &mut V) {
        match self {
            LessonDocument::ModuleLesson { sections } => {
                for paragraph in sections.iter().flat_map(|s| s.0.iter()) {
                    paragraph.walk(visitor);
                }
            }
            LessonDocument::ModuleAssessment { items } => {
                for item in items {
                    item.walk(visitor);
                }
            }
            LessonDocument::Other => {}
        }
    }

    /// Image locators referenced by this document, duplicates included.
    pub fn image_locators(&self) -> Vec<ResourceLocator> {
        let mut collector = ImageCollector::default();
        self.walk(&mut collector);
        collector.locators
    }
}

#[derive(Default)]
struct ImageCollector {
    locators: Vec<ResourceLocator>,
}

impl DocumentVisitor for ImageCollector {
    fn visit_field(&mut self, _name: &str, value: &FieldValue) {
        if let FieldValue::Image(image) = value {
            self.locators.push(ResourceLocator::new(image.url.clone()));
        }
    }
}
