//! TTL cache for linkpeek page metadata.
//!
//! [`MetaCache`] maps normalized URLs to [`linkpeek_core::MetadataRecord`]s and
//! treats expired records as absent. Records live in a [`linkpeek_core::CacheStore`]:
//! [`MemoryStore`] for a single process, [`FileStore`] to survive restarts.

mod cache;
mod store;

pub use cache::{normalize_url, CacheConfig, CacheStats, MetaCache};
pub use store::{FileStore, MemoryStore};
