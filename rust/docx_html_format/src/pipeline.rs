use crate::dom::HtmlDocument;
use crate::error::Result;
use crate::images::style_image_paragraphs;
use crate::pretty::pretty_print;
use crate::remap::remap_headings;
use crate::sanitize::sanitize;
use tracing::debug;

/// Runs the full post-processing chain over converter output.
///
/// Stage order is fixed: image styling must see the paragraphs created by
/// heading remapping. Nothing is returned unless every stage succeeds.
pub fn process(raw_html: &str) -> Result<String> {
    let sanitized = sanitize(raw_html);
    debug!(input = raw_html.len(), sanitized = sanitized.len(), "sanitized html");

    let mut doc = HtmlDocument::parse(&sanitized)?;

    let remapped = remap_headings(&mut doc);
    debug!(remapped, "remapped headings");

    let styled = style_image_paragraphs(&mut doc);
    debug!(styled, "styled image paragraphs");

    let html = pretty_print(&doc)?;
    debug!(output = html.len(), "formatted html");
    Ok(html)
}
