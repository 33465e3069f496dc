//! In-memory preview surface.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use linkpeek_core::error::Result;
use linkpeek_core::{Anchor, AnchorId, CardId, Geometry, PreviewSurface};

/// A card currently attached to the surface.
#[derive(Clone, Debug, PartialEq)]
pub struct AttachedCard {
    /// Anchor the card hangs off
    pub anchor: AnchorId,
    /// Card markup
    pub html: String,
    /// Current opacity
    pub opacity: f32,
}

/// Something that happened on the surface, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceEvent {
    /// A card was attached (at opacity 0).
    Attached { card: CardId, anchor: AnchorId },
    /// A card's opacity changed.
    Opacity { card: CardId, opacity: f32 },
    /// A card was removed.
    Detached { card: CardId },
}

/// Surface that keeps cards in memory and records every change.
///
/// Anchors measure as the default [`Geometry`] until
/// [`set_geometry`](Self::set_geometry) says otherwise.
#[derive(Debug, Default)]
pub struct MemorySurface {
    cards: Mutex<BTreeMap<CardId, AttachedCard>>,
    geometry: Mutex<HashMap<AnchorId, Geometry>>,
    events: Mutex<Vec<SurfaceEvent>>,
    next_card: AtomicU64,
}

impl MemorySurface {
    /// Creates an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets what `bounding_geometry` reports for `anchor`.
    pub fn set_geometry(&self, anchor: AnchorId, geometry: Geometry) {
        self.geometry.lock().insert(anchor, geometry);
    }

    /// Every attached card.
    pub fn cards(&self) -> Vec<(CardId, AttachedCard)> {
        self.cards.lock().iter().map(|(id, c)| (*id, c.clone())).collect()
    }

    /// A single attached card.
    pub fn card(&self, card: CardId) -> Option<AttachedCard> {
        self.cards.lock().get(&card).cloned()
    }

    /// Cards attached to `anchor`.
    pub fn cards_for(&self, anchor: AnchorId) -> Vec<AttachedCard> {
        self.cards
            .lock()
            .values()
            .filter(|c| c.anchor == anchor)
            .cloned()
            .collect()
    }

    /// Number of attached cards.
    pub fn attached_count(&self) -> usize {
        self.cards.lock().len()
    }

    /// Every event so far.
    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events.lock().clone()
    }
}

impl PreviewSurface for MemorySurface {
    fn attach_card(&self, anchor: &Anchor, fragment: &str) -> Result<CardId> {
        let card = CardId(self.next_card.fetch_add(1, Ordering::SeqCst) + 1);
        self.cards.lock().insert(
            card,
            AttachedCard {
                anchor: anchor.id,
                html: fragment.to_string(),
                opacity: 0.0,
            },
        );
        self.events.lock().push(SurfaceEvent::Attached {
            card,
            anchor: anchor.id,
        });
        Ok(card)
    }

    fn set_opacity(&self, card: CardId, opacity: f32) {
        if let Some(attached) = self.cards.lock().get_mut(&card) {
            attached.opacity = opacity;
            self.events.lock().push(SurfaceEvent::Opacity { card, opacity });
        }
    }

    fn detach_card(&self, card: CardId) {
        if self.cards.lock().remove(&card).is_some() {
            self.events.lock().push(SurfaceEvent::Detached { card });
        }
    }

    fn bounding_geometry(&self, anchor: AnchorId) -> Geometry {
        self.geometry.lock().get(&anchor).copied().unwrap_or_default()
    }
}
