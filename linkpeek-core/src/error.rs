//! Error types for linkpeek.
//!
//! [`FetchError`] is the only failure the preview lifecycle ever sees; it is
//! reported and swallowed there. [`PreviewError`] covers everything else
//! (configuration, storage, surfaces) and wraps fetch failures for callers
//! that want a single error type.

use thiserror::Error;

/// Result type alias using `PreviewError`.
pub type Result<T> = std::result::Result<T, PreviewError>;

/// Failure to produce a metadata record for a URL.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSPORT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The request could not be sent or the body could not be read.
    #[error("Network error fetching '{url}': {reason}")]
    Network {
        /// Requested URL
        url: String,
        /// Client error message
        reason: String,
    },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} fetching '{url}'")]
    Status {
        /// Requested URL
        url: String,
        /// Response status code
        status: u16,
    },

    /// The request did not complete in time.
    #[error("Timed out after {seconds}s fetching '{url}'")]
    Timeout {
        /// Requested URL
        url: String,
        /// Configured timeout
        seconds: u64,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // PARSE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The body is not a markup document.
    #[error("Malformed document at '{url}': {reason}")]
    MalformedDocument {
        /// Requested URL
        url: String,
        /// What was wrong with the body
        reason: String,
    },
}

impl FetchError {
    /// Returns true for network, status, and timeout failures.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FetchError::Network { .. } | FetchError::Status { .. } | FetchError::Timeout { .. }
        )
    }

    /// Returns true when the document arrived but could not be parsed.
    pub fn is_parse(&self) -> bool {
        matches!(self, FetchError::MalformedDocument { .. })
    }

    /// The URL the failed fetch was for.
    pub fn url(&self) -> &str {
        match self {
            FetchError::Network { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Timeout { url, .. }
            | FetchError::MalformedDocument { url, .. } => url,
        }
    }
}

/// Main error type for linkpeek operations.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// Metadata could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    // ═══════════════════════════════════════════════════════════════════════════
    // BINDING ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// No binding exists for the anchor.
    #[error("Unknown anchor: {0}")]
    UnknownAnchor(usize),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration value is missing or out of range.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The selector attribute cannot be turned into a CSS selector.
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector {
        /// Configured selector attribute
        selector: String,
        /// Why it was rejected
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The cache store could not be read or written.
    #[error("Cache store error: {0}")]
    StoreError(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl PreviewError {
    /// Returns true if a later attempt could succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            PreviewError::Fetch(e) => e.is_transport(),
            PreviewError::IoError(_) | PreviewError::StoreError(_) => true,
            _ => false,
        }
    }
}
