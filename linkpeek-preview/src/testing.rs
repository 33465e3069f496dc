//! Test doubles for the preview crate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use linkpeek_cache::MetaCache;
use linkpeek_core::error::FetchError;
use linkpeek_core::{DocumentTransport, PreviewConfig};
use linkpeek_fetch::{HtmlExtractor, MetaFetcher};

use crate::lifecycle::PreviewContext;
use crate::surface::MemorySurface;

/// Serves canned pages after a fixed delay and logs every request.
pub(crate) struct DelayedTransport {
    pages: HashMap<String, Bytes>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl DelayedTransport {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            pages: HashMap::new(),
            delay,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn page(mut self, url: &str, title: &str, description: &str) -> Self {
        let html = format!(
            r#"<html><head><title>{}</title><meta name="description" content="{}"></head></html>"#,
            title, description
        );
        self.pages.insert(url.to_string(), Bytes::from(html));
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl DocumentTransport for DelayedTransport {
    async fn fetch_document(&self, url: &str) -> std::result::Result<Bytes, FetchError> {
        self.calls.lock().push(url.to_string());
        tokio::time::sleep(self.delay).await;
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// A context wired to an in-memory surface and cache.
pub(crate) struct Harness {
    pub(crate) ctx: Arc<PreviewContext>,
    pub(crate) surface: Arc<MemorySurface>,
    pub(crate) transport: Arc<DelayedTransport>,
    pub(crate) fetcher: Arc<MetaFetcher>,
}

impl Harness {
    pub(crate) fn new(config: PreviewConfig, transport: DelayedTransport) -> Self {
        let transport = Arc::new(transport);
        let surface = Arc::new(MemorySurface::new());
        let fetcher = Arc::new(MetaFetcher::new(
            Arc::new(MetaCache::new()),
            transport.clone(),
            Arc::new(HtmlExtractor::new()),
        ));
        let ctx = PreviewContext::new(Arc::new(config), fetcher.clone(), surface.clone())
            .expect("tests run inside a runtime");

        Self {
            ctx,
            surface,
            transport,
            fetcher,
        }
    }
}

/// Lets spawned tasks run, then moves paused time forward.
pub(crate) async fn advance(ms: u64) {
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(ms)).await;
    tokio::task::yield_now().await;
}
