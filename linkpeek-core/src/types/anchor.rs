//! Link elements as seen by the controller and the surface.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle for a link element on the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnchorId(pub usize);

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor#{}", self.0)
    }
}

/// Opaque handle for an attached preview card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(pub u64);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card#{}", self.0)
    }
}

/// A link element found while scanning a document, before validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkElement {
    /// Surface handle of the element
    pub id: AnchorId,
    /// Raw `href` attribute, if any
    pub href: Option<String>,
    /// Whether the element carries the configured selector attribute
    pub has_selector: bool,
}

impl LinkElement {
    /// A marked element with the given href.
    pub fn marked(id: AnchorId, href: impl Into<String>) -> Self {
        Self {
            id,
            href: Some(href.into()),
            has_selector: true,
        }
    }
}

/// A validated preview target: a surface handle plus an absolute URL.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Anchor {
    /// Surface handle of the element
    pub id: AnchorId,
    /// Absolute target URL
    pub url: String,
}

impl Anchor {
    /// Creates an anchor.
    pub fn new(id: AnchorId, url: impl Into<String>) -> Self {
        Self { id, url: url.into() }
    }
}

/// Bounding box of an anchor, in surface pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Distance from the viewport top
    pub top: f64,
    /// Distance from the viewport left
    pub left: f64,
    /// Box width
    pub width: f64,
    /// Box height; the card is placed this far below the anchor's top edge
    pub height: f64,
}

impl Geometry {
    /// Creates a geometry.
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self { top, left, width, height }
    }
}
