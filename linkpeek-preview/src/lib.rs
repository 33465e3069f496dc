//! # linkpeek Preview
//!
//! Hover previews for links: one [`PreviewLifecycle`] state machine per link,
//! bound to link elements by a [`PreviewController`].
//!
//! ```text
//! Idle ──enter──▶ Fetching ──fetched──▶ Displayed ──leave──▶ FadingOut ──timer──▶ Idle
//!                    │  └──failed/leave──▶ Idle                  └──enter──▶ Fetching
//! ```
//!
//! Cards are attached through a [`linkpeek_core::PreviewSurface`];
//! [`MemorySurface`] keeps them in memory for tests and the CLI.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod controller;
mod discover;
mod lifecycle;
mod surface;
mod template;
mod timer;

#[cfg(test)]
mod testing;

pub use controller::{LinkBinding, LinkListeners, PointerEvent, PreviewController};
pub use discover::{discover_links, resolve_href};
pub use lifecycle::{FetchToken, PreviewContext, PreviewLifecycle, PreviewState};
pub use surface::{AttachedCard, MemorySurface, SurfaceEvent};
pub use template::{escape_html, render_card};
