//! Page metadata as shown on a preview card.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata extracted from a linked page.
///
/// Every text field is empty when the page does not provide it. The record
/// carries its own expiry so it can be stored as a single value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Page title
    #[serde(default)]
    pub title: String,
    /// Short page description
    #[serde(default)]
    pub description: String,
    /// Image URL
    #[serde(default)]
    pub image: String,
    /// Instant after which the record is no longer fresh
    pub expires_at: DateTime<Utc>,
}

impl MetadataRecord {
    /// Creates an empty record that expires at `expires_at`.
    pub fn empty(expires_at: DateTime<Utc>) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            image: String::new(),
            expires_at,
        }
    }

    /// Returns true while `now` is strictly before the expiry.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Applies one metadata tag to the record.
    ///
    /// Recognized names overwrite the matching field, so applying tags in
    /// document order makes the last one win. Returns false for names that
    /// do not map to a field.
    pub fn apply_tag(&mut self, tag: &MetaTag) -> bool {
        let field = match tag.name.as_str() {
            "title" => &mut self.title,
            "description" => &mut self.description,
            "image" => &mut self.image,
            _ => return false,
        };
        *field = tag.content.clone();
        true
    }
}

/// A `name`/`content` pair from a document's metadata tags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTag {
    /// Tag name (from `name`, `itemprop`, or `property`)
    pub name: String,
    /// Tag content, empty when the attribute is missing
    pub content: String,
}

impl MetaTag {
    /// Creates a tag.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}
