//! Preview card markup.

use linkpeek_core::{Geometry, MetadataRecord, PreviewConfig};

/// Builds the card fragment for a record.
///
/// The card is absolutely positioned `geometry.height` pixels below the
/// anchor's top edge and starts fully transparent. The image block is left
/// out when the record has no image.
pub fn render_card(config: &PreviewConfig, geometry: &Geometry, record: &MetadataRecord) -> String {
    let style = format!(
        "position: absolute; top: {}px; left: 0; opacity: 0; z-index: {};",
        geometry.height, config.z_index
    );

    let image = if record.image.is_empty() {
        String::new()
    } else {
        format!(
            r#"<img src="{}" class="{}">"#,
            escape_html(&record.image),
            escape_html(&config.image_class)
        )
    };

    format!(
        concat!(
            r#"<div class="{} {}" style="{}">"#,
            r#"<div class="{}">"#,
            "{}",
            r#"<div class="{}">"#,
            r#"<h3 class="{}">{}</h3>"#,
            r#"<p class="{}">{}</p>"#,
            "</div></div></div>"
        ),
        escape_html(&config.default_class),
        escape_html(&config.root_class),
        style,
        escape_html(&config.container_class),
        image,
        escape_html(&config.content_class),
        escape_html(&config.title_class),
        escape_html(&record.title),
        escape_html(&config.description_class),
        escape_html(&record.description),
    )
}

/// Escapes text for use in element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
