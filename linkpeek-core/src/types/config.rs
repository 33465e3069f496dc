//! Preview configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{PreviewError, Result};

/// Read-only configuration shared by every binding.
///
/// Built once, then wrapped in an `Arc` and handed to the controller. Every
/// field is optional in serialized form and falls back to the defaults in
/// [`crate::constants`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Attribute marking preview targets
    pub selector: String,
    /// Class present on every card root
    pub default_class: String,
    /// Extra classes on the card root
    pub root_class: String,
    /// Classes on the bordered container
    pub container_class: String,
    /// Classes on the image
    pub image_class: String,
    /// Classes on the text block
    pub content_class: String,
    /// Classes on the title heading
    pub title_class: String,
    /// Classes on the description paragraph
    pub description_class: String,
    /// Stacking order of cards
    pub z_index: i32,
    /// Milliseconds between attach and full opacity
    pub transition_in_ms: u64,
    /// Milliseconds between fade-out and detach
    pub transition_out_ms: u64,
    /// Seconds a fetched record stays fresh
    pub cache_ttl_seconds: u64,
    /// Clear every card on each hover and pin cards on leave
    pub debug: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            selector: DEFAULT_SELECTOR.into(),
            default_class: DEFAULT_CARD_CLASS.into(),
            root_class: DEFAULT_ROOT_CLASS.into(),
            container_class: DEFAULT_CONTAINER_CLASS.into(),
            image_class: DEFAULT_IMAGE_CLASS.into(),
            content_class: DEFAULT_CONTENT_CLASS.into(),
            title_class: DEFAULT_TITLE_CLASS.into(),
            description_class: DEFAULT_DESCRIPTION_CLASS.into(),
            z_index: DEFAULT_Z_INDEX,
            transition_in_ms: DEFAULT_TRANSITION_IN_MS,
            transition_out_ms: DEFAULT_TRANSITION_OUT_MS,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            debug: false,
        }
    }
}

impl PreviewConfig {
    /// Reads overrides from `LINKPEEK_*` environment variables.
    ///
    /// A `.env` file is loaded first when present. Unset variables keep their
    /// defaults; unparseable numbers are a configuration error.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    /// Loads a JSON configuration file. Missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        let text = |key: &str, field: &mut String| {
            if let Some(value) = lookup(key) {
                *field = value;
            }
        };
        text("SELECTOR", &mut config.selector);
        text("DEFAULT_CLASS", &mut config.default_class);
        text("ROOT_CLASS", &mut config.root_class);
        text("CONTAINER_CLASS", &mut config.container_class);
        text("IMAGE_CLASS", &mut config.image_class);
        text("CONTENT_CLASS", &mut config.content_class);
        text("TITLE_CLASS", &mut config.title_class);
        text("DESCRIPTION_CLASS", &mut config.description_class);

        if let Some(v) = lookup("Z_INDEX") {
            config.z_index = parse_number("Z_INDEX", &v)?;
        }
        if let Some(v) = lookup("TRANSITION_IN_MS") {
            config.transition_in_ms = parse_number("TRANSITION_IN_MS", &v)?;
        }
        if let Some(v) = lookup("TRANSITION_OUT_MS") {
            config.transition_out_ms = parse_number("TRANSITION_OUT_MS", &v)?;
        }
        if let Some(v) = lookup("CACHE_TTL_SECONDS") {
            config.cache_ttl_seconds = parse_number("CACHE_TTL_SECONDS", &v)?;
        }
        if let Some(v) = lookup("DEBUG") {
            config.debug = v != "false" && v != "0";
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the selector attribute.
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    /// Sets the card root class.
    pub fn with_default_class(mut self, class: impl Into<String>) -> Self {
        self.default_class = class.into();
        self
    }

    /// Sets both transition delays.
    pub fn with_transitions(mut self, in_ms: u64, out_ms: u64) -> Self {
        self.transition_in_ms = in_ms;
        self.transition_out_ms = out_ms;
        self
    }

    /// Sets the cache TTL.
    pub fn with_cache_ttl(mut self, seconds: u64) -> Self {
        self.cache_ttl_seconds = seconds;
        self
    }

    /// Enables or disables debug mode.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Checks that the configuration can drive a controller.
    pub fn validate(&self) -> Result<()> {
        let selector = self.selector.trim();
        if selector.is_empty() {
            return Err(PreviewError::ConfigError("selector cannot be empty".into()));
        }
        if selector.chars().any(|c| c.is_whitespace() || "[]=\"'".contains(c)) {
            return Err(PreviewError::InvalidSelector {
                selector: self.selector.clone(),
                reason: "must be a bare attribute name".into(),
            });
        }
        if self.default_class.trim().is_empty() || self.default_class.contains(char::is_whitespace) {
            return Err(PreviewError::ConfigError(
                "default_class must be a single class name".into(),
            ));
        }
        if self.cache_ttl_seconds == 0 {
            return Err(PreviewError::ConfigError("cache_ttl_seconds must be positive".into()));
        }
        Ok(())
    }

    /// Delay before a freshly attached card becomes opaque.
    pub fn transition_in(&self) -> Duration {
        Duration::from_millis(self.transition_in_ms)
    }

    /// Delay before a faded card is detached.
    pub fn transition_out(&self) -> Duration {
        Duration::from_millis(self.transition_out_ms)
    }

    /// Freshness window for cached records.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| PreviewError::ConfigError(format!("{ENV_PREFIX}{key}: invalid number '{value}'")))
}
