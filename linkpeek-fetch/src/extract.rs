//! HTML metadata extraction.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use linkpeek_core::error::FetchError;
use linkpeek_core::{MetaTag, MetadataExtractor};

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static META_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta").unwrap());

/// Extracts the title and metadata tags from an HTML document.
///
/// A tag's name comes from its `name` attribute, else `itemprop`, else
/// `property`. html5ever recovers from any input, so extraction itself
/// never fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    /// Creates an extractor.
    pub fn new() -> Self {
        Self
    }
}

impl MetadataExtractor for HtmlExtractor {
    fn extract_title(&self, markup: &str) -> Result<String, FetchError> {
        let document = Html::parse_document(markup);
        Ok(document
            .select(&TITLE_SELECTOR)
            .next()
            .map(|title| title.text().collect::<String>().trim().to_string())
            .unwrap_or_default())
    }

    fn extract_meta_tags(&self, markup: &str) -> Result<Vec<MetaTag>, FetchError> {
        let document = Html::parse_document(markup);
        Ok(document
            .select(&META_SELECTOR)
            .filter_map(|meta| {
                let attrs = meta.value();
                let name = attrs
                    .attr("name")
                    .or_else(|| attrs.attr("itemprop"))
                    .or_else(|| attrs.attr("property"))?;
                Some(MetaTag::new(name, attrs.attr("content").unwrap_or_default()))
            })
            .collect())
    }
}
