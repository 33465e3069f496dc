//! Defaults and fixed names for linkpeek.
//!
//! The class names mirror the utility classes the preview card has always
//! shipped with, so existing stylesheets keep matching.

// ═══════════════════════════════════════════════════════════════════════════════
// DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

/// Attribute that marks an element as a preview target.
pub const DEFAULT_SELECTOR: &str = "data-tb-link-preview";

// ═══════════════════════════════════════════════════════════════════════════════
// CARD CLASSES
// ═══════════════════════════════════════════════════════════════════════════════

/// Class carried by every preview card root; used to find all attached cards.
pub const DEFAULT_CARD_CLASS: &str = "__lp-preview";

/// Classes applied to the card root next to [`DEFAULT_CARD_CLASS`].
pub const DEFAULT_ROOT_CLASS: &str = "pt-1 text-slate-600 transition w-[280px] duration-300";

/// Classes for the bordered container inside the root.
pub const DEFAULT_CONTAINER_CLASS: &str = "bg-white rounded border overflow-hidden";

/// Classes for the preview image.
pub const DEFAULT_IMAGE_CLASS: &str = "h-[140px] w-full object-cover";

/// Classes for the text block under the image.
pub const DEFAULT_CONTENT_CLASS: &str = "px-4 py-2";

/// Classes for the title heading.
pub const DEFAULT_TITLE_CLASS: &str = "line-clamp-1 font-semibold mb-2";

/// Classes for the description paragraph.
pub const DEFAULT_DESCRIPTION_CLASS: &str = "line-clamp-2 leading-tight";

// ═══════════════════════════════════════════════════════════════════════════════
// TIMING & STACKING
// ═══════════════════════════════════════════════════════════════════════════════

/// Stacking order of an attached card.
pub const DEFAULT_Z_INDEX: i32 = 100;

/// Delay between attaching a card and raising its opacity to 1.
pub const DEFAULT_TRANSITION_IN_MS: u64 = 50;

/// Delay between dropping a card's opacity to 0 and detaching it.
pub const DEFAULT_TRANSITION_OUT_MS: u64 = 350;

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Freshness window of a cached metadata record (30 minutes).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 30 * 60;

/// Namespace prefixed to every cache store key.
pub const CACHE_KEY_PREFIX: &str = "link-preview-";

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Request timeout for document fetches.
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// User agent sent with document fetches.
pub const DEFAULT_USER_AGENT: &str = concat!("linkpeek/", env!("CARGO_PKG_VERSION"));

/// Environment variable prefix read by [`crate::PreviewConfig::from_env`].
pub const ENV_PREFIX: &str = "LINKPEEK_";
