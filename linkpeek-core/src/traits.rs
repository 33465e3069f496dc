//! Collaborator interfaces for linkpeek.
//!
//! The fetch pipeline and the preview lifecycle only talk to the outside world
//! through these traits, so tests can swap in in-memory implementations.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{FetchError, Result};
use crate::types::{Anchor, AnchorId, CardId, Geometry, MetaTag};

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Retrieves the body of a document.
#[async_trait]
pub trait DocumentTransport: Send + Sync {
    /// Fetches the document at `url`. One attempt, no retries.
    ///
    /// Transports that know the document's charset return the body
    /// transcoded to UTF-8; anything else is decoded lossily by the caller.
    async fn fetch_document(&self, url: &str) -> std::result::Result<Bytes, FetchError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Pulls metadata out of markup.
pub trait MetadataExtractor: Send + Sync {
    /// Text of the document's title element, empty when there is none.
    fn extract_title(&self, markup: &str) -> std::result::Result<String, FetchError>;

    /// Every metadata tag that has a name, in document order.
    fn extract_meta_tags(&self, markup: &str) -> std::result::Result<Vec<MetaTag>, FetchError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// SURFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Where preview cards are attached and how anchors are measured.
pub trait PreviewSurface: Send + Sync {
    /// Attaches `fragment` inside `anchor`. The card starts at opacity 0.
    fn attach_card(&self, anchor: &Anchor, fragment: &str) -> Result<CardId>;

    /// Sets a card's opacity. Unknown cards are ignored.
    fn set_opacity(&self, card: CardId, opacity: f32);

    /// Removes a card. Unknown cards are ignored.
    fn detach_card(&self, card: CardId);

    /// Current bounding box of the anchor.
    fn bounding_geometry(&self, anchor: AnchorId) -> Geometry;
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE
// ═══════════════════════════════════════════════════════════════════════════════

/// String key-value storage backing the metadata cache.
pub trait CacheStore: Send + Sync {
    /// Returns the stored value for `key`.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: String) -> Result<()>;

    /// Removes `key`.
    fn delete(&self, key: &str) -> Result<()>;

    /// Every stored key.
    fn keys(&self) -> Result<Vec<String>>;
}
