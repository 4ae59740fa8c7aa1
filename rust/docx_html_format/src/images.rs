//! Centering and sizing for paragraphs that carry an image.

use crate::dom::{Element, HtmlDocument, Node};

const PARAGRAPH_STYLE: [(&str, &str); 2] = [("text-align", "center"), ("margin", "10px 0px")];
const IMAGE_STYLE: [(&str, &str); 3] = [
    ("max-width", "100%"),
    ("height", "auto"),
    ("display", "inline-block"),
];

/// Merges declarations into an inline `style` value. Properties already
/// present are overwritten in place, others are appended.
pub fn merge_style(existing: Option<&str>, decls: &[(&str, &str)]) -> String {
    let mut props: Vec<(String, String)> = existing
        .unwrap_or_default()
        .split(';')
        .filter_map(|d| d.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect();
    for (name, value) in decls {
        match props.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => props.push((name.to_string(), value.to_string())),
        }
    }
    props
        .iter()
        .map(|(k, v)| format!("{k}: {v};"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn apply_style(el: &mut Element, decls: &[(&str, &str)]) {
    let style = merge_style(el.attr("style"), decls);
    el.set_attr("style", style);
}

/// Styles every paragraph containing an image, and the first such image.
/// Returns the number of paragraphs styled.
pub fn style_image_paragraphs(doc: &mut HtmlDocument) -> usize {
    style_children(&mut doc.body_mut().children)
}

fn style_children(children: &mut [Node]) -> usize {
    let mut styled = 0;
    for child in children.iter_mut() {
        let Node::Element(el) = child else {
            continue;
        };
        if el.is("p") {
            if let Some(img) = el.find_descendant_mut("img") {
                apply_style(img, &IMAGE_STYLE);
                apply_style(el, &PARAGRAPH_STYLE);
                styled += 1;
            }
        }
        styled += style_children(&mut el.children);
    }
    styled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(html: &str) -> String {
        let mut doc = HtmlDocument::parse(html).unwrap();
        style_image_paragraphs(&mut doc);
        doc.inner_html()
    }

    #[test]
    fn centers_paragraph_and_sizes_image() {
        assert_eq!(
            style(r#"<p><img src="x"/></p>"#),
            r#"<p style="text-align: center; margin: 10px 0px;"><img src="x" style="max-width: 100%; height: auto; display: inline-block;"></p>"#
        );
    }

    #[test]
    fn only_first_image_is_sized() {
        let out = style(r#"<p><img src="a"><img src="b"></p>"#);
        assert!(out.contains(r#"<img src="a" style="#));
        assert!(out.contains(r#"<img src="b">"#));
        assert!(out.starts_with(r#"<p style="text-align: center; margin: 10px 0px;">"#));
    }

    #[test]
    fn finds_nested_images() {
        let out = style(r#"<p><u>caption <img src="a"></u></p>"#);
        assert!(out.starts_with(r#"<p style="#), "{out}");
    }

    #[test]
    fn paragraphs_without_images_are_untouched() {
        assert_eq!(style("<p>text</p><div><img src=\"x\"></div>"), "<p>text</p><div><img src=\"x\"></div>");
    }

    #[test]
    fn styling_twice_is_stable() {
        let mut doc = HtmlDocument::parse(r#"<p><img src="x"></p>"#).unwrap();
        style_image_paragraphs(&mut doc);
        let once = doc.inner_html();
        style_image_paragraphs(&mut doc);
        assert_eq!(doc.inner_html(), once);
    }

    #[test]
    fn merge_keeps_unrelated_declarations() {
        assert_eq!(
            merge_style(Some("color: red; margin: 0"), &[("margin", "10px 0px")]),
            "color: red; margin: 10px 0px;"
        );
        assert_eq!(merge_style(None, &[("height", "auto")]), "height: auto;");
    }
}
