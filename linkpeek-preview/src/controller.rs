//! Binds preview lifecycles to link elements.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, instrument};
use url::Url;

use linkpeek_core::error::{PreviewError, Result};
use linkpeek_core::{Anchor, AnchorId, LinkElement, PreviewConfig, PreviewSurface};
use linkpeek_fetch::MetaFetcher;

use crate::discover::resolve_href;
use crate::lifecycle::{PreviewContext, PreviewLifecycle, PreviewState};

/// A pointer event on a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerEvent {
    /// Pointer moved onto the link
    Enter(AnchorId),
    /// Pointer moved off the link
    Leave(AnchorId),
}

impl PointerEvent {
    /// The link the event targets.
    pub fn anchor(&self) -> AnchorId {
        match self {
            PointerEvent::Enter(anchor) | PointerEvent::Leave(anchor) => *anchor,
        }
    }
}

/// Handler pair for one link element.
pub struct LinkListeners {
    /// Call on pointer enter
    pub on_enter: Box<dyn Fn() + Send + Sync>,
    /// Call on pointer leave
    pub on_leave: Box<dyn Fn() + Send + Sync>,
}

/// One discovered link and the lifecycle that owns its preview.
#[derive(Clone, Debug)]
pub struct LinkBinding {
    lifecycle: Arc<PreviewLifecycle>,
}

impl LinkBinding {
    /// The bound link.
    pub fn anchor(&self) -> &Anchor {
        self.lifecycle.anchor()
    }

    /// The link's lifecycle.
    pub fn lifecycle(&self) -> &Arc<PreviewLifecycle> {
        &self.lifecycle
    }

    /// Current preview state.
    pub fn state(&self) -> PreviewState {
        self.lifecycle.state()
    }

    /// Listeners that drive this binding's lifecycle and no other.
    pub fn listeners(&self) -> LinkListeners {
        let enter = Arc::clone(&self.lifecycle);
        let leave = Arc::clone(&self.lifecycle);
        LinkListeners {
            on_enter: Box::new(move || enter.enter()),
            on_leave: Box::new(move || leave.leave()),
        }
    }
}

/// Owns every link binding of a document.
///
/// All bindings share one configuration, one fetcher and its cache, and one
/// surface.
///
/// # Example
///
/// ```rust,ignore
/// let links = discover_links(&html, &config.selector);
/// let controller = PreviewController::initialize(config, fetcher, surface, links, None)?;
/// controller.pointer_enter(AnchorId(0))?;
/// ```
pub struct PreviewController {
    ctx: Arc<PreviewContext>,
    bindings: BTreeMap<AnchorId, LinkBinding>,
}

impl PreviewController {
    /// Validates `config` and binds every marked link with a usable href.
    ///
    /// Unmarked links and links whose href is missing, empty, or not http(s)
    /// are skipped. Relative hrefs resolve against `base_url`. The fetcher's
    /// cache must use the configured TTL. Must run inside a tokio runtime.
    #[instrument(skip_all)]
    pub fn initialize(
        config: PreviewConfig,
        fetcher: Arc<MetaFetcher>,
        surface: Arc<dyn PreviewSurface>,
        links: impl IntoIterator<Item = LinkElement>,
        base_url: Option<&Url>,
    ) -> Result<Self> {
        config.validate()?;

        let cache_ttl = fetcher.cache().ttl().num_seconds();
        if u64::try_from(cache_ttl).ok() != Some(config.cache_ttl_seconds) {
            return Err(PreviewError::ConfigError(format!(
                "cache TTL is {}s but the configuration says {}s",
                cache_ttl, config.cache_ttl_seconds
            )));
        }

        let ctx = PreviewContext::new(Arc::new(config), fetcher, surface)?;

        let mut bindings = BTreeMap::new();
        let mut skipped = 0usize;
        for link in links {
            if !link.has_selector {
                continue;
            }
            let Some(url) = resolve_href(link.href.as_deref(), base_url) else {
                debug!(anchor = %link.id, href = ?link.href, "Skipping link without usable href");
                skipped += 1;
                continue;
            };

            let lifecycle = PreviewLifecycle::new(Anchor::new(link.id, url), &ctx);
            bindings.insert(link.id, LinkBinding { lifecycle });
        }

        info!(bound = bindings.len(), skipped, "Link previews initialized");
        Ok(Self { ctx, bindings })
    }

    /// Shared configuration.
    pub fn config(&self) -> &PreviewConfig {
        self.ctx.config()
    }

    /// Shared fetcher.
    pub fn fetcher(&self) -> &Arc<MetaFetcher> {
        self.ctx.fetcher()
    }

    /// All bindings, ordered by anchor.
    pub fn bindings(&self) -> impl Iterator<Item = &LinkBinding> {
        self.bindings.values()
    }

    /// Number of bound links.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no link was bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The binding for `anchor`.
    pub fn binding(&self, anchor: AnchorId) -> Option<&LinkBinding> {
        self.bindings.get(&anchor)
    }

    fn lookup(&self, anchor: AnchorId) -> Result<&LinkBinding> {
        self.bindings
            .get(&anchor)
            .ok_or(PreviewError::UnknownAnchor(anchor.0))
    }

    /// Pointer entered `anchor`.
    pub fn pointer_enter(&self, anchor: AnchorId) -> Result<()> {
        self.lookup(anchor)?.lifecycle.enter();
        Ok(())
    }

    /// Pointer left `anchor`.
    pub fn pointer_leave(&self, anchor: AnchorId) -> Result<()> {
        self.lookup(anchor)?.lifecycle.leave();
        Ok(())
    }

    /// Routes a pointer event to its binding.
    pub fn dispatch(&self, event: PointerEvent) -> Result<()> {
        match event {
            PointerEvent::Enter(anchor) => self.pointer_enter(anchor),
            PointerEvent::Leave(anchor) => self.pointer_leave(anchor),
        }
    }

    /// Removes every preview and drops all bindings.
    pub fn teardown(&mut self) {
        for binding in self.bindings.values() {
            binding.lifecycle.force_remove();
        }
        let count = self.bindings.len();
        self.bindings.clear();
        debug!(count, "Link previews torn down");
    }
}

impl Drop for PreviewController {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::discover_links;
    use crate::surface::MemorySurface;
    use crate::testing::{advance, DelayedTransport, Harness};
    use linkpeek_cache::{CacheConfig, MemoryStore, MetaCache};
    use linkpeek_fetch::HtmlExtractor;
    use std::time::Duration;

    const PAGE: &str = r#"<html><body>
        <a href="https://example.com/a" data-tb-link-preview>A</a>
        <a href="https://example.com/b">unmarked</a>
        <a data-tb-link-preview>no href</a>
        <a href="" data-tb-link-preview>empty</a>
        <a href="/b" data-tb-link-preview>B</a>
    </body></html>"#;

    fn controller(config: PreviewConfig) -> (PreviewController, Harness) {
        let transport = DelayedTransport::new(Duration::from_millis(100))
            .page("https://example.com/a", "A", "About A")
            .page("https://example.com/b", "B", "About B");
        let h = Harness::new(config.clone(), transport);
        let base = Url::parse("https://example.com/").unwrap();
        let links = discover_links(PAGE, &config.selector);
        let controller = PreviewController::initialize(
            config,
            h.fetcher.clone(),
            h.surface.clone(),
            links,
            Some(&base),
        )
        .unwrap();
        (controller, h)
    }

    #[tokio::test]
    async fn test_binds_only_marked_links_with_href() {
        let (controller, _h) = controller(PreviewConfig::default());

        let anchors: Vec<_> = controller.bindings().map(|b| b.anchor().clone()).collect();
        assert_eq!(
            anchors,
            vec![
                Anchor::new(AnchorId(0), "https://example.com/a"),
                Anchor::new(AnchorId(4), "https://example.com/b"),
            ]
        );
        assert!(controller.binding(AnchorId(1)).is_none());
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let h = Harness::new(PreviewConfig::default(), DelayedTransport::new(Duration::ZERO));
        let result = PreviewController::initialize(
            PreviewConfig::default().with_selector(""),
            h.fetcher.clone(),
            h.surface.clone(),
            Vec::new(),
            None,
        );

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_rejects_fetcher_with_other_ttl() {
        let h = Harness::new(PreviewConfig::default(), DelayedTransport::new(Duration::ZERO));
        let result = PreviewController::initialize(
            PreviewConfig::default().with_cache_ttl(60),
            h.fetcher.clone(),
            h.surface.clone(),
            Vec::new(),
            None,
        );

        assert!(matches!(result, Err(PreviewError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_shares_configured_ttl() {
        let fetcher = Arc::new(MetaFetcher::new(
            Arc::new(MetaCache::with_store(
                Arc::new(MemoryStore::new()),
                CacheConfig::with_ttl_seconds(60),
            )),
            Arc::new(DelayedTransport::new(Duration::ZERO)),
            Arc::new(HtmlExtractor::new()),
        ));
        let controller = PreviewController::initialize(
            PreviewConfig::default().with_cache_ttl(60),
            fetcher,
            Arc::new(MemorySurface::new()),
            Vec::new(),
            None,
        )
        .unwrap();

        assert_eq!(controller.config().cache_ttl_seconds, 60);
        assert_eq!(controller.fetcher().cache().ttl().num_seconds(), 60);
    }

    #[tokio::test]
    async fn test_unknown_anchor() {
        let (controller, _h) = controller(PreviewConfig::default());
        let err = controller.pointer_enter(AnchorId(1)).unwrap_err();
        assert!(matches!(err, PreviewError::UnknownAnchor(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_listeners_drive_their_own_binding() {
        let (controller, h) = controller(PreviewConfig::default());
        let a = controller.binding(AnchorId(0)).unwrap().listeners();
        let b = controller.binding(AnchorId(4)).unwrap();

        (a.on_enter)();
        advance(200).await;
        assert_eq!(controller.binding(AnchorId(0)).unwrap().state(), PreviewState::Displayed);
        assert_eq!(b.state(), PreviewState::Idle);

        (a.on_leave)();
        advance(400).await;
        assert_eq!(h.surface.attached_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_shared_across_bindings() {
        let (controller, h) = controller(PreviewConfig::default());

        controller.dispatch(PointerEvent::Enter(AnchorId(0))).unwrap();
        advance(200).await;
        controller.dispatch(PointerEvent::Leave(AnchorId(0))).unwrap();
        advance(400).await;

        controller.dispatch(PointerEvent::Enter(AnchorId(0))).unwrap();
        controller.dispatch(PointerEvent::Enter(AnchorId(4))).unwrap();
        advance(200).await;

        assert_eq!(h.transport.calls().len(), 2);
        assert_eq!(h.surface.attached_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_removes_cards() {
        let (mut controller, h) = controller(PreviewConfig::default());

        controller.pointer_enter(AnchorId(0)).unwrap();
        controller.pointer_enter(AnchorId(4)).unwrap();
        advance(200).await;
        assert_eq!(h.surface.attached_count(), 2);

        controller.teardown();
        assert!(controller.is_empty());
        assert_eq!(h.surface.attached_count(), 0);
    }

    #[test]
    fn test_pointer_event_anchor() {
        assert_eq!(PointerEvent::Enter(AnchorId(2)).anchor(), AnchorId(2));
        assert_eq!(PointerEvent::Leave(AnchorId(5)).anchor(), AnchorId(5));
    }
}
