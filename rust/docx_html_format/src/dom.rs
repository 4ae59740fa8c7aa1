//! Owned HTML tree built from an html5ever parse.
//!
//! The rcdom produced by html5ever is reference counted and interior-mutable;
//! it is copied once into plain owned nodes so the rewrite passes can replace
//! children in place through `&mut` without any shared handles.

use crate::error::{Error, Result};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builds `tag` holding `text` inside the given chain of wrappers,
    /// outermost first: `nested("p", &["b", "u"], "x")` is `<p><b><u>x</u></b></p>`.
    pub fn nested(tag: &str, wrappers: &[&str], text: &str) -> Self {
        let mut inner = Node::Text(text.to_string());
        for wrapper in wrappers.iter().rev() {
            let mut el = Element::new(wrapper);
            el.children.push(inner);
            inner = Node::Element(el);
        }
        let mut el = Element::new(tag);
        el.children.push(inner);
        el
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: String) {
        match self.attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// First descendant element with the given tag, in document order.
    pub fn find_descendant_mut(&mut self, tag: &str) -> Option<&mut Element> {
        for child in self.children.iter_mut() {
            if let Node::Element(el) = child {
                if el.is(tag) {
                    return Some(el);
                }
                if let Some(found) = el.find_descendant_mut(tag) {
                    return Some(found);
                }
            }
        }
        None
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for n in nodes {
        match n {
            Node::Text(t) => out.push_str(t),
            Node::Element(el) => collect_text(&el.children, out),
            Node::Comment(_) => {}
        }
    }
}

/// Ancestor chain of the element currently visited by a tree walk.
#[derive(Debug, Default)]
pub struct Ancestors {
    tags: Vec<String>,
}

impl Ancestors {
    pub fn push(&mut self, tag: &str) {
        self.tags.push(tag.to_ascii_lowercase());
    }

    pub fn pop(&mut self) {
        self.tags.pop();
    }

    /// Nearest ancestor whose tag is one of `kinds`.
    pub fn closest(&self, kinds: &[&str]) -> Option<&str> {
        self.tags
            .iter()
            .rev()
            .map(String::as_str)
            .find(|t| kinds.iter().any(|k| k.eq_ignore_ascii_case(t)))
    }
}

/// A parsed document, rooted at a synthetic `body` element.
#[derive(Clone, Debug)]
pub struct HtmlDocument {
    body: Element,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Result<Self> {
        let wrapped = format!("<body>{html}</body>");
        let dom = parse_document(RcDom::default(), Default::default()).one(wrapped.as_str());
        let body = find_elem(&dom.document, "body")
            .ok_or_else(|| Error::Parse("document has no body element".to_string()))?;
        let mut root = Element::new("body");
        root.children = convert_children(&body);
        Ok(Self { body: root })
    }

    pub fn body(&self) -> &Element {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Element {
        &mut self.body
    }

    /// Compact serialization of the body's children.
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for n in &self.body.children {
            write_node(&mut out, n, false);
        }
        out
    }
}

fn find_elem(node: &Handle, name: &str) -> Option<Handle> {
    if let NodeData::Element { name: q, .. } = &node.data {
        if q.local.to_string().eq_ignore_ascii_case(name) {
            return Some(node.clone());
        }
    }
    for c in node.children.borrow().iter() {
        if let Some(x) = find_elem(c, name) {
            return Some(x);
        }
    }
    None
}

fn convert_children(h: &Handle) -> Vec<Node> {
    h.children.borrow().iter().filter_map(convert_node).collect()
}

fn convert_node(h: &Handle) -> Option<Node> {
    match &h.data {
        NodeData::Text { contents } => Some(Node::Text(contents.borrow().to_string())),
        NodeData::Comment { contents } => Some(Node::Comment(contents.to_string())),
        NodeData::Element { name, attrs, .. } => Some(Node::Element(Element {
            tag: name.local.to_string(),
            attrs: attrs
                .borrow()
                .iter()
                .map(|a| (a.name.local.to_string(), a.value.to_string()))
                .collect(),
            children: convert_children(h),
        })),
        NodeData::Document | NodeData::Doctype { .. } | NodeData::ProcessingInstruction { .. } => None,
    }
}

pub(crate) fn is_void(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source" | "track" | "wbr"
    )
}

pub(crate) fn is_raw_text(tag: &str) -> bool {
    matches!(tag.to_ascii_lowercase().as_str(), "script" | "style")
}

pub(crate) fn esc_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn esc_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn write_start_tag(out: &mut String, el: &Element) {
    out.push('<');
    out.push_str(&el.tag);
    for (k, v) in &el.attrs {
        out.push(' ');
        out.push_str(k);
        out.push_str("=\"");
        out.push_str(&esc_attr(v));
        out.push('"');
    }
    out.push('>');
}

pub(crate) fn write_node(out: &mut String, n: &Node, raw: bool) {
    match n {
        Node::Text(t) if raw => out.push_str(t),
        Node::Text(t) => out.push_str(&esc_text(t)),
        Node::Comment(c) => {
            out.push_str("<!--");
            out.push_str(c);
            out.push_str("-->");
        }
        Node::Element(el) => {
            write_start_tag(out, el);
            if is_void(&el.tag) {
                return;
            }
            let raw = is_raw_text(&el.tag);
            for c in &el.children {
                write_node(out, c, raw);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fragment_under_body() {
        let doc = HtmlDocument::parse("<h1>Title</h1><p>Body</p>").unwrap();
        let tags: Vec<&str> = doc
            .body()
            .children
            .iter()
            .filter_map(|n| match n {
                Node::Element(el) => Some(el.tag.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(tags, ["h1", "p"]);
    }

    #[test]
    fn keeps_unknown_heading_tag() {
        let doc = HtmlDocument::parse("<h7>Deep</h7>").unwrap();
        assert_eq!(doc.inner_html(), "<h7>Deep</h7>");
    }

    #[test]
    fn round_trips_entities_and_void_elements() {
        let doc = HtmlDocument::parse(r#"<p>a &amp; b&nbsp;c<br/><img src="x" alt="&quot;q&quot;"/></p>"#).unwrap();
        assert_eq!(
            doc.inner_html(),
            r#"<p>a &amp; b&nbsp;c<br><img src="x" alt="&quot;q&quot;"></p>"#
        );
    }

    #[test]
    fn text_content_skips_comments() {
        let doc = HtmlDocument::parse("<p>a<!-- hidden --><b>b</b></p>").unwrap();
        let Node::Element(p) = &doc.body().children[0] else {
            panic!("expected element");
        };
        assert_eq!(p.text_content(), "ab");
    }

    #[test]
    fn nested_builds_wrapper_chain() {
        let el = Element::nested("p", &["b", "u"], "x");
        let mut out = String::new();
        write_node(&mut out, &Node::Element(el), false);
        assert_eq!(out, "<p><b><u>x</u></b></p>");
    }

    #[test]
    fn set_attr_replaces_existing_value() {
        let mut el = Element::new("p");
        el.set_attr("style", "a".to_string());
        el.set_attr("STYLE", "b".to_string());
        assert_eq!(el.attrs, vec![("style".to_string(), "b".to_string())]);
    }

    #[test]
    fn closest_finds_nearest_matching_ancestor() {
        let mut a = Ancestors::default();
        a.push("table");
        a.push("td");
        a.push("div");
        assert_eq!(a.closest(&["li", "td"]), Some("td"));
        a.pop();
        a.pop();
        assert_eq!(a.closest(&["li", "td"]), None);
    }
}
