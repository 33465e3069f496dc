//! Cache-first metadata fetcher.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use linkpeek_cache::MetaCache;
use linkpeek_core::error::{FetchError, Result};
use linkpeek_core::{DocumentTransport, MetaTag, MetadataExtractor, MetadataRecord};

use crate::extract::HtmlExtractor;
use crate::transport::{HttpTransport, HttpTransportConfig};

/// Fetcher that turns URLs into metadata records.
///
/// Resolves a URL by:
/// 1. Returning the cached record while it is fresh (no I/O)
/// 2. Downloading the document through the transport
/// 3. Taking the `<title>` text as the fallback title, then applying every
///    recognized metadata tag in document order (last one wins)
/// 4. Stamping `expires_at = now + ttl` and storing the record
///
/// Failures are logged and returned; nothing is cached and nothing is retried.
pub struct MetaFetcher {
    cache: Arc<MetaCache>,
    transport: Arc<dyn DocumentTransport>,
    extractor: Arc<dyn MetadataExtractor>,
}

impl MetaFetcher {
    /// Creates a fetcher from its collaborators.
    pub fn new(
        cache: Arc<MetaCache>,
        transport: Arc<dyn DocumentTransport>,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Self {
        Self {
            cache,
            transport,
            extractor,
        }
    }

    /// Creates a fetcher that downloads over HTTP and parses HTML.
    pub fn http(cache: Arc<MetaCache>, config: HttpTransportConfig) -> Result<Self> {
        let transport = HttpTransport::with_config(config)?;
        Ok(Self::new(cache, Arc::new(transport), Arc::new(HtmlExtractor::new())))
    }

    /// The cache this fetcher reads and fills.
    pub fn cache(&self) -> &Arc<MetaCache> {
        &self.cache
    }

    /// Resolves `url` to its metadata.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let fetcher = MetaFetcher::http(Arc::new(MetaCache::new()), HttpTransportConfig::default())?;
    /// let meta = fetcher.fetch("https://example.com/a").await?;
    /// ```
    pub async fn fetch(&self, url: &str) -> std::result::Result<MetadataRecord, FetchError> {
        self.fetch_detailed(url).await.map(|r| r.record)
    }

    /// Like [`fetch`](Self::fetch), also reporting whether the cache answered.
    #[instrument(skip(self))]
    pub async fn fetch_detailed(&self, url: &str) -> std::result::Result<FetchResult, FetchError> {
        if let Some(record) = self.cache.get(url) {
            debug!(url, "Cache hit");
            return Ok(FetchResult {
                record,
                url: url.to_string(),
                from_cache: true,
            });
        }

        debug!(url, "Cache miss, fetching");

        let record = match self.download(url).await {
            Ok(record) => record,
            Err(e) => {
                warn!(url, error = %e, transport = e.is_transport(), "Metadata fetch failed");
                return Err(e);
            }
        };

        if let Err(e) = self.cache.put(url, &record) {
            warn!(url, error = %e, "Failed to cache metadata");
        }

        info!(url, title = %record.title, "Fetched metadata");

        Ok(FetchResult {
            record,
            url: url.to_string(),
            from_cache: false,
        })
    }

    async fn download(&self, url: &str) -> std::result::Result<MetadataRecord, FetchError> {
        let body = self.transport.fetch_document(url).await?;

        let markup = String::from_utf8_lossy(&body);
        if markup.trim().is_empty() {
            return Err(FetchError::MalformedDocument {
                url: url.to_string(),
                reason: "empty document".into(),
            });
        }

        let title = self.extractor.extract_title(&markup)?;
        let tags = self.extractor.extract_meta_tags(&markup)?;

        Ok(build_record(title, &tags, self.cache.expiry_from_now()))
    }
}

/// Folds a fallback title and document-ordered tags into a record.
///
/// Later tags with the same recognized name override earlier ones.
pub fn build_record(
    fallback_title: String,
    tags: &[MetaTag],
    expires_at: DateTime<Utc>,
) -> MetadataRecord {
    let mut record = MetadataRecord::empty(expires_at);
    record.title = fallback_title;
    for tag in tags {
        record.apply_tag(tag);
    }
    record
}

/// Result of a fetch with provenance.
#[derive(Clone, Debug)]
pub struct FetchResult {
    /// The resolved metadata
    pub record: MetadataRecord,
    /// The URL that was resolved
    pub url: String,
    /// Whether the result came from cache
    pub from_cache: bool,
}
