//! Domain types for linkpeek.
//!
//! - [`MetadataRecord`]: title/description/image of a page plus its cache expiry
//! - [`MetaTag`]: one name/content pair pulled from a document
//! - [`Anchor`], [`LinkElement`], [`Geometry`]: what the surface knows about a link
//! - [`PreviewConfig`]: the shared, read-only configuration

mod anchor;
mod config;
mod record;

pub use anchor::*;
pub use config::*;
pub use record::*;
