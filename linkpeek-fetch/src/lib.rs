//! # linkpeek Fetch
//!
//! Resolves a URL to page metadata, cache first.
//!
//! [`MetaFetcher`] consults the shared [`linkpeek_cache::MetaCache`], and on a
//! miss downloads the page through a [`linkpeek_core::DocumentTransport`],
//! extracts title/description/image through a
//! [`linkpeek_core::MetadataExtractor`], and stores the result.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod extract;
mod fetcher;
mod transport;

pub use extract::HtmlExtractor;
pub use fetcher::{build_record, FetchResult, MetaFetcher};
pub use transport::{HttpTransport, HttpTransportConfig};
