//! # linkpeek Core
//!
//! Core types, errors, and traits shared by every linkpeek crate:
//!
//! - **Types**: metadata records, anchors, geometry, and preview configuration
//! - **Errors**: fetch failures and the workspace-wide error enum
//! - **Constants**: configuration defaults and cache key namespace
//! - **Traits**: the transport, extraction, surface, and storage seams
//!
//! ## Example
//!
//! ```rust
//! use linkpeek_core::{MetadataRecord, PreviewConfig};
//!
//! let config = PreviewConfig::default().with_debug(true);
//! assert!(config.validate().is_ok());
//!
//! let record = MetadataRecord::default();
//! let json = serde_json::to_string(&record).unwrap();
//! assert!(json.contains("expires_at"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod clock;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use constants::*;
pub use error::{FetchError, PreviewError, Result};
pub use traits::*;
pub use types::*;
