//! Per-link preview state machine.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tracing::{debug, instrument, warn};

use linkpeek_core::error::{FetchError, PreviewError, Result};
use linkpeek_core::{Anchor, CardId, Geometry, MetadataRecord, PreviewConfig, PreviewSurface};
use linkpeek_fetch::MetaFetcher;

use crate::template::render_card;
use crate::timer::{schedule, ScheduledTask};

/// Where a link's preview currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewState {
    /// No card, nothing in flight.
    Idle,
    /// Metadata fetch in flight.
    Fetching,
    /// Card attached and fading in or fully visible.
    Displayed,
    /// Card transparent, waiting to be detached.
    FadingOut,
}

impl fmt::Display for PreviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PreviewState::Idle => "idle",
            PreviewState::Fetching => "fetching",
            PreviewState::Displayed => "displayed",
            PreviewState::FadingOut => "fading-out",
        };
        f.write_str(name)
    }
}

/// Identifies one fetch issued by a binding.
///
/// Tokens only grow; a settled fetch whose token is no longer the binding's
/// active one is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchToken(pub u64);

/// How a finished fetch was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Settlement {
    Displayed(CardId),
    Failed,
    StaleDiscarded,
}

/// Collaborators shared by every lifecycle under one controller.
pub struct PreviewContext {
    config: Arc<PreviewConfig>,
    fetcher: Arc<MetaFetcher>,
    surface: Arc<dyn PreviewSurface>,
    runtime: Handle,
    lifecycles: RwLock<Vec<Weak<PreviewLifecycle>>>,
}

impl PreviewContext {
    /// Creates a context bound to the current tokio runtime.
    ///
    /// Fails outside a runtime: fetches and transition timers are spawned on it.
    pub fn new(
        config: Arc<PreviewConfig>,
        fetcher: Arc<MetaFetcher>,
        surface: Arc<dyn PreviewSurface>,
    ) -> Result<Arc<Self>> {
        let runtime = Handle::try_current().map_err(|e| {
            PreviewError::ConfigError(format!("previews need a tokio runtime: {}", e))
        })?;

        Ok(Arc::new(Self {
            config,
            fetcher,
            surface,
            runtime,
            lifecycles: RwLock::new(Vec::new()),
        }))
    }

    /// The shared configuration.
    pub fn config(&self) -> &Arc<PreviewConfig> {
        &self.config
    }

    /// The shared fetcher.
    pub fn fetcher(&self) -> &Arc<MetaFetcher> {
        &self.fetcher
    }

    fn register(&self, lifecycle: &Arc<PreviewLifecycle>) {
        let mut lifecycles = self.lifecycles.write();
        lifecycles.retain(|l| l.strong_count() > 0);
        lifecycles.push(Arc::downgrade(lifecycle));
    }

    fn live(&self) -> Vec<Arc<PreviewLifecycle>> {
        self.lifecycles.read().iter().filter_map(Weak::upgrade).collect()
    }

    /// Detaches every attached card under this context.
    ///
    /// Returns how many cards were removed.
    pub fn clear_all_cards(&self) -> usize {
        self.live().iter().filter(|l| l.sweep_card()).count()
    }
}

#[derive(Debug)]
struct BindingState {
    state: PreviewState,
    active_token: Option<FetchToken>,
    last_token: u64,
    card: Option<CardId>,
    timer: Option<ScheduledTask>,
    last_timer: u64,
}

impl BindingState {
    fn new() -> Self {
        Self {
            state: PreviewState::Idle,
            active_token: None,
            last_token: 0,
            card: None,
            timer: None,
            last_timer: 0,
        }
    }

    fn issue_token(&mut self) -> FetchToken {
        self.last_token += 1;
        let token = FetchToken(self.last_token);
        self.active_token = Some(token);
        token
    }

    fn next_timer_id(&mut self) -> u64 {
        self.last_timer += 1;
        self.last_timer
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    fn owns_timer(&self, id: u64) -> bool {
        self.timer.as_ref().map(ScheduledTask::id) == Some(id)
    }
}

/// Hover preview state machine for one link.
///
/// Events for one link are serialized by the binding's lock; fetch results
/// and timers carry the token or timer id they were issued with and are
/// ignored once superseded.
pub struct PreviewLifecycle {
    anchor: Anchor,
    ctx: Arc<PreviewContext>,
    binding: Mutex<BindingState>,
}

impl PreviewLifecycle {
    /// Creates an idle lifecycle for `anchor` and registers it with `ctx`.
    pub fn new(anchor: Anchor, ctx: &Arc<PreviewContext>) -> Arc<Self> {
        let lifecycle = Arc::new(Self {
            anchor,
            ctx: Arc::clone(ctx),
            binding: Mutex::new(BindingState::new()),
        });
        ctx.register(&lifecycle);
        lifecycle
    }

    /// The link this lifecycle drives.
    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    /// Current state.
    pub fn state(&self) -> PreviewState {
        self.binding.lock().state
    }

    /// The attached card, if any.
    pub fn card(&self) -> Option<CardId> {
        self.binding.lock().card
    }

    /// The fetch currently allowed to render, if any.
    pub fn active_token(&self) -> Option<FetchToken> {
        self.binding.lock().active_token
    }

    /// Pointer entered the link.
    ///
    /// In debug mode every attached card under the context is removed first
    /// and this link restarts from idle.
    #[instrument(skip(self), fields(anchor = %self.anchor.id))]
    pub fn enter(self: &Arc<Self>) {
        if self.ctx.config.debug {
            let removed = self.ctx.clear_all_cards();
            debug!(removed, "Debug mode cleared previews");
            self.force_remove();
        }

        let mut binding = self.binding.lock();
        let state = binding.state;
        match state {
            PreviewState::Idle => self.start_fetch(&mut binding),
            PreviewState::Fetching | PreviewState::Displayed => {
                debug!(%state, "Preview already active");
            }
            PreviewState::FadingOut => {
                binding.cancel_timer();
                if let Some(card) = binding.card.take() {
                    self.ctx.surface.detach_card(card);
                }
                debug!("Re-entered during fade-out, restarting");
                self.start_fetch(&mut binding);
            }
        }
    }

    /// Pointer left the link.
    #[instrument(skip(self), fields(anchor = %self.anchor.id))]
    pub fn leave(self: &Arc<Self>) {
        let mut binding = self.binding.lock();
        let state = binding.state;
        match state {
            PreviewState::Idle | PreviewState::FadingOut => {}
            PreviewState::Fetching => {
                binding.active_token = None;
                binding.state = PreviewState::Idle;
                debug!("Left before fetch settled");
            }
            PreviewState::Displayed => {
                if self.ctx.config.debug {
                    debug!("Debug mode keeps preview pinned");
                    return;
                }

                binding.cancel_timer();
                if let Some(card) = binding.card {
                    self.ctx.surface.set_opacity(card, 0.0);
                }
                binding.state = PreviewState::FadingOut;

                let id = binding.next_timer_id();
                let this = Arc::clone(self);
                binding.timer = Some(schedule(
                    &self.ctx.runtime,
                    id,
                    self.ctx.config.transition_out(),
                    move || this.on_fade_out_elapsed(id),
                ));
            }
        }
    }

    /// Resets to idle: cancels timers, drops the in-flight fetch, and detaches
    /// the card immediately.
    pub fn force_remove(&self) {
        let mut binding = self.binding.lock();
        self.reset(&mut binding);
    }

    /// Like [`force_remove`](Self::force_remove), but only when a card is attached.
    fn sweep_card(&self) -> bool {
        let mut binding = self.binding.lock();
        if binding.card.is_none() {
            return false;
        }
        self.reset(&mut binding);
        true
    }

    fn reset(&self, binding: &mut BindingState) {
        binding.cancel_timer();
        binding.active_token = None;
        if let Some(card) = binding.card.take() {
            self.ctx.surface.detach_card(card);
        }
        binding.state = PreviewState::Idle;
    }

    fn start_fetch(self: &Arc<Self>, binding: &mut BindingState) {
        let token = binding.issue_token();
        binding.state = PreviewState::Fetching;

        let geometry = self.ctx.surface.bounding_geometry(self.anchor.id);
        debug!(token = token.0, url = %self.anchor.url, "Fetching preview");

        let this = Arc::clone(self);
        self.ctx.runtime.spawn(async move {
            let result = this.ctx.fetcher.fetch(&this.anchor.url).await;
            this.settle(token, geometry, result);
        });
    }

    fn settle(
        self: &Arc<Self>,
        token: FetchToken,
        geometry: Geometry,
        result: std::result::Result<MetadataRecord, FetchError>,
    ) -> Settlement {
        let mut binding = self.binding.lock();

        if binding.state != PreviewState::Fetching || binding.active_token != Some(token) {
            debug!(anchor = %self.anchor.id, token = token.0, "Discarding stale fetch result");
            return Settlement::StaleDiscarded;
        }
        binding.active_token = None;

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(anchor = %self.anchor.id, error = %e, "No preview available");
                binding.state = PreviewState::Idle;
                return Settlement::Failed;
            }
        };

        let fragment = render_card(&self.ctx.config, &geometry, &record);
        let card = match self.ctx.surface.attach_card(&self.anchor, &fragment) {
            Ok(card) => card,
            Err(e) => {
                warn!(anchor = %self.anchor.id, error = %e, "Failed to attach preview");
                binding.state = PreviewState::Idle;
                return Settlement::Failed;
            }
        };

        binding.card = Some(card);
        binding.state = PreviewState::Displayed;

        let id = binding.next_timer_id();
        let this = Arc::clone(self);
        binding.timer = Some(schedule(
            &self.ctx.runtime,
            id,
            self.ctx.config.transition_in(),
            move || this.on_fade_in_elapsed(id),
        ));

        debug!(anchor = %self.anchor.id, %card, "Preview attached");
        Settlement::Displayed(card)
    }

    fn on_fade_in_elapsed(&self, timer: u64) {
        let mut binding = self.binding.lock();
        if !binding.owns_timer(timer) {
            return;
        }
        binding.timer = None;

        if binding.state == PreviewState::Displayed {
            if let Some(card) = binding.card {
                self.ctx.surface.set_opacity(card, 1.0);
            }
        }
    }

    fn on_fade_out_elapsed(&self, timer: u64) {
        let mut binding = self.binding.lock();
        if !binding.owns_timer(timer) {
            return;
        }
        binding.timer = None;

        if binding.state == PreviewState::FadingOut {
            if let Some(card) = binding.card.take() {
                self.ctx.surface.detach_card(card);
            }
            binding.state = PreviewState::Idle;
            debug!(anchor = %self.anchor.id, "Preview removed");
        }
    }
}

impl fmt::Debug for PreviewLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewLifecycle")
            .field("anchor", &self.anchor)
            .field("binding", &*self.binding.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{MemorySurface, SurfaceEvent};
    use crate::testing::{advance, DelayedTransport, Harness};
    use linkpeek_cache::MetaCache;
    use linkpeek_core::AnchorId;
    use linkpeek_fetch::HtmlExtractor;
    use std::time::Duration;

    const URL_A: &str = "https://example.com/a";
    const URL_B: &str = "https://example.com/b";

    fn harness(config: PreviewConfig) -> Harness {
        let transport = DelayedTransport::new(Duration::from_millis(100))
            .page(URL_A, "A", "About A")
            .page(URL_B, "B", "About B");
        Harness::new(config, transport)
    }

    fn lifecycle(h: &Harness, id: usize, url: &str) -> Arc<PreviewLifecycle> {
        PreviewLifecycle::new(Anchor::new(AnchorId(id), url), &h.ctx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_hover_attaches_then_fades_in() {
        let h = harness(PreviewConfig::default());
        let link = lifecycle(&h, 0, URL_A);

        link.enter();
        assert_eq!(link.state(), PreviewState::Fetching);

        advance(99).await;
        assert_eq!(h.surface.attached_count(), 0);

        advance(2).await;
        assert_eq!(link.state(), PreviewState::Displayed);
        let card = link.card().unwrap();
        let attached = h.surface.card(card).unwrap();
        assert_eq!(attached.opacity, 0.0);
        assert!(attached.html.contains("About A"));

        advance(47).await;
        assert_eq!(h.surface.card(card).unwrap().opacity, 0.0);

        advance(3).await;
        assert_eq!(h.surface.card(card).unwrap().opacity, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leave_fades_out_then_detaches() {
        let h = harness(PreviewConfig::default());
        let link = lifecycle(&h, 0, URL_A);

        link.enter();
        advance(200).await;
        let card = link.card().unwrap();

        link.leave();
        assert_eq!(link.state(), PreviewState::FadingOut);
        assert_eq!(h.surface.card(card).unwrap().opacity, 0.0);

        advance(349).await;
        assert!(h.surface.card(card).is_some());

        advance(2).await;
        assert!(h.surface.card(card).is_none());
        assert_eq!(link.state(), PreviewState::Idle);
        assert_eq!(link.card(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_transition_delays() {
        let h = harness(PreviewConfig::default().with_transitions(20, 100));
        let link = lifecycle(&h, 0, URL_A);

        link.enter();
        advance(101).await;
        let card = link.card().unwrap();

        advance(17).await;
        assert_eq!(h.surface.card(card).unwrap().opacity, 0.0);
        advance(3).await;
        assert_eq!(h.surface.card(card).unwrap().opacity, 1.0);

        link.leave();
        advance(99).await;
        assert!(h.surface.card(card).is_some());
        advance(2).await;
        assert!(h.surface.card(card).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_leave_before_fetch_settles_shows_nothing() {
        let h = harness(PreviewConfig::default());
        let link = lifecycle(&h, 0, URL_A);

        link.enter();
        advance(10).await;
        link.leave();
        assert_eq!(link.state(), PreviewState::Idle);
        assert_eq!(link.active_token(), None);

        advance(500).await;
        assert!(h.surface.events().is_empty());
        assert_eq!(link.state(), PreviewState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_latest_fetch_renders() {
        let h = harness(PreviewConfig::default());
        let link = lifecycle(&h, 0, URL_A);

        link.enter();
        advance(10).await;
        link.leave();
        link.enter();
        assert_eq!(link.active_token(), Some(FetchToken(2)));

        advance(300).await;
        assert_eq!(h.transport.calls().len(), 2);
        assert_eq!(h.surface.attached_count(), 1);
        assert_eq!(link.state(), PreviewState::Displayed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_while_fetching_is_ignored() {
        let h = harness(PreviewConfig::default());
        let link = lifecycle(&h, 0, URL_A);

        link.enter();
        advance(10).await;
        link.enter();
        link.enter();

        advance(300).await;
        assert_eq!(h.transport.calls(), vec![URL_A.to_string()]);
        assert_eq!(h.surface.attached_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reenter_during_fade_out_restarts() {
        let h = harness(PreviewConfig::default());
        let link = lifecycle(&h, 0, URL_A);

        link.enter();
        advance(200).await;
        let first = link.card().unwrap();

        link.leave();
        advance(100).await;
        link.enter();
        assert!(h.surface.card(first).is_none());
        assert_eq!(link.state(), PreviewState::Fetching);

        advance(1).await;
        assert_eq!(link.state(), PreviewState::Displayed);
        let second = link.card().unwrap();
        assert_ne!(first, second);

        advance(1000).await;
        assert!(h.surface.card(second).is_some());
        assert_eq!(h.surface.card(second).unwrap().opacity, 1.0);
        assert_eq!(h.transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_returns_to_idle() {
        let h = harness(PreviewConfig::default());
        let link = lifecycle(&h, 0, "https://example.com/missing");

        link.enter();
        advance(200).await;

        assert_eq!(link.state(), PreviewState::Idle);
        assert_eq!(h.surface.attached_count(), 0);

        link.enter();
        assert_eq!(link.state(), PreviewState::Fetching);
    }

    #[tokio::test(start_paused = true)]
    async fn test_geometry_measured_at_enter() {
        let h = harness(PreviewConfig::default());
        let link = lifecycle(&h, 0, URL_A);
        h.surface.set_geometry(AnchorId(0), Geometry::new(0.0, 0.0, 60.0, 18.0));

        link.enter();
        h.surface.set_geometry(AnchorId(0), Geometry::new(0.0, 0.0, 60.0, 40.0));
        advance(200).await;

        let html = h.surface.card(link.card().unwrap()).unwrap().html;
        assert!(html.contains("top: 18px"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_settlement_is_discarded() {
        let h = harness(PreviewConfig::default());
        let link = lifecycle(&h, 0, URL_A);

        link.enter();
        let token = link.active_token().unwrap();

        let stale = link.settle(FetchToken(token.0 + 1), Geometry::default(), Ok(MetadataRecord::default()));
        assert_eq!(stale, Settlement::StaleDiscarded);
        assert_eq!(link.state(), PreviewState::Fetching);

        let applied = link.settle(token, Geometry::default(), Ok(MetadataRecord::default()));
        assert!(matches!(applied, Settlement::Displayed(_)));

        advance(200).await;
        assert_eq!(h.surface.attached_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_remove_cancels_everything() {
        let h = harness(PreviewConfig::default());
        let link = lifecycle(&h, 0, URL_A);

        link.enter();
        advance(120).await;
        link.leave();
        link.force_remove();

        assert_eq!(link.state(), PreviewState::Idle);
        assert_eq!(h.surface.attached_count(), 0);

        advance(1000).await;
        let detached = h
            .surface
            .events()
            .iter()
            .filter(|e| matches!(e, SurfaceEvent::Detached { .. }))
            .count();
        assert_eq!(detached, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debug_mode_pins_and_sweeps() {
        let h = harness(PreviewConfig::default().with_debug(true));
        let first = lifecycle(&h, 0, URL_A);
        let second = lifecycle(&h, 1, URL_B);

        first.enter();
        advance(200).await;
        first.leave();
        advance(1000).await;
        assert_eq!(first.state(), PreviewState::Displayed);
        let pinned = first.card().unwrap();

        second.enter();
        assert!(h.surface.card(pinned).is_none());
        assert_eq!(first.state(), PreviewState::Idle);
        assert_eq!(second.state(), PreviewState::Fetching);

        advance(200).await;
        assert_eq!(h.surface.attached_count(), 1);
        assert_eq!(h.surface.cards_for(AnchorId(1)).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debug_reenter_restarts_own_preview() {
        let h = harness(PreviewConfig::default().with_debug(true));
        let link = lifecycle(&h, 0, URL_A);

        link.enter();
        advance(200).await;
        let first = link.card().unwrap();

        link.enter();
        assert!(h.surface.card(first).is_none());
        assert_eq!(link.state(), PreviewState::Fetching);
    }

    #[test]
    fn test_context_requires_runtime() {
        let fetcher = Arc::new(MetaFetcher::new(
            Arc::new(MetaCache::new()),
            Arc::new(DelayedTransport::new(Duration::ZERO)),
            Arc::new(HtmlExtractor::new()),
        ));
        let result = PreviewContext::new(
            Arc::new(PreviewConfig::default()),
            fetcher,
            Arc::new(MemorySurface::new()),
        );

        assert!(matches!(result, Err(PreviewError::ConfigError(_))));
    }
}
