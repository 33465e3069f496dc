//! Link discovery in HTML documents.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use linkpeek_core::{AnchorId, LinkElement};

static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// Lists every `<a>` element of `markup` in document order.
///
/// Ids are assigned sequentially from zero. `attribute` is the marker
/// attribute that opts a link into previews.
pub fn discover_links(markup: &str, attribute: &str) -> Vec<LinkElement> {
    let document = Html::parse_document(markup);
    document
        .select(&ANCHOR_SELECTOR)
        .enumerate()
        .map(|(index, element)| {
            let attrs = element.value();
            LinkElement {
                id: AnchorId(index),
                href: attrs.attr("href").map(str::to_string),
                has_selector: attrs.attr(attribute).is_some(),
            }
        })
        .collect()
}

/// Turns a raw `href` into an absolute http(s) URL.
///
/// Relative references resolve against `base`; without one they are
/// rejected, as are empty values and other schemes.
pub fn resolve_href(href: Option<&str>, base: Option<&Url>) -> Option<String> {
    let href = href?.trim();
    if href.is_empty() {
        return None;
    }

    let url = match Url::parse(href) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(href).ok()?,
        Err(_) => return None,
    };

    match url.scheme() {
        "http" | "https" => Some(url.to_string()),
        _ => None,
    }
}
