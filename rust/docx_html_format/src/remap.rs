//! Heading demotion and casing rules.
//!
//! Every tag the converter can produce for a paragraph-level block maps to
//! exactly one [`HeadingAction`]; [`HeadingKind::action`] is the whole policy.

use crate::dom::{Ancestors, Element, HtmlDocument, Node};
use lazy_static::lazy_static;
use regex::Regex;

/// Plain paragraphs shorter than this (in characters) are treated as captions.
pub const SHORT_PARAGRAPH_CHARS: usize = 60;

/// Text inside these containers is never rewritten.
const CONTAINERS: [&str; 2] = ["li", "td"];

lazy_static! {
    static ref SUBDIVISION: Regex = Regex::new(r"(?i)^subdivisi").unwrap();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeadingKind {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    /// `h7`, produced by the custom seventh heading style.
    H7,
    Paragraph,
    Other,
}

impl HeadingKind {
    pub const ALL: [HeadingKind; 9] = [
        HeadingKind::H1,
        HeadingKind::H2,
        HeadingKind::H3,
        HeadingKind::H4,
        HeadingKind::H5,
        HeadingKind::H6,
        HeadingKind::H7,
        HeadingKind::Paragraph,
        HeadingKind::Other,
    ];

    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "h1" => HeadingKind::H1,
            "h2" => HeadingKind::H2,
            "h3" => HeadingKind::H3,
            "h4" => HeadingKind::H4,
            "h5" => HeadingKind::H5,
            "h6" => HeadingKind::H6,
            "h7" => HeadingKind::H7,
            "p" => HeadingKind::Paragraph,
            _ => HeadingKind::Other,
        }
    }

    pub fn action(self) -> HeadingAction {
        match self {
            HeadingKind::H1 => HeadingAction::RetagUppercase { tag: "h3" },
            HeadingKind::H2 => HeadingAction::RetagUppercase { tag: "h4" },
            HeadingKind::H3 => HeadingAction::RetagUppercase { tag: "h5" },
            HeadingKind::H4 => HeadingAction::RetagUppercase { tag: "h6" },
            HeadingKind::H5 => HeadingAction::DemoteToParagraph {
                emphasis: Emphasis::BoldUnderline,
            },
            HeadingKind::H6 => HeadingAction::DemoteToParagraph {
                emphasis: Emphasis::Bold,
            },
            HeadingKind::H7 => HeadingAction::DemoteToParagraph {
                emphasis: Emphasis::Underline,
            },
            HeadingKind::Paragraph => HeadingAction::UnderlineIfShortOrSubdivision,
            HeadingKind::Other => HeadingAction::Keep,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emphasis {
    BoldUnderline,
    Bold,
    Underline,
}

impl Emphasis {
    fn wrappers(self) -> &'static [&'static str] {
        match self {
            Emphasis::BoldUnderline => &["b", "u"],
            Emphasis::Bold => &["b"],
            Emphasis::Underline => &["u"],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeadingAction {
    /// Retag, uppercase the text and wrap it in `strong`.
    RetagUppercase { tag: &'static str },
    /// Replace with a title-cased paragraph inside the given emphasis.
    DemoteToParagraph { emphasis: Emphasis },
    /// Underline and title-case a paragraph that reads like a sub-heading.
    UnderlineIfShortOrSubdivision,
    Keep,
}

impl HeadingAction {
    /// The node that replaces an element whose trimmed text is `text`, if any.
    pub fn apply(self, text: &str) -> Option<Element> {
        match self {
            HeadingAction::RetagUppercase { tag } => {
                Some(Element::nested(tag, &["strong"], &text.to_uppercase()))
            }
            HeadingAction::DemoteToParagraph { emphasis } => {
                Some(Element::nested("p", emphasis.wrappers(), &title_case(text)))
            }
            HeadingAction::UnderlineIfShortOrSubdivision => {
                let short = text.chars().count() < SHORT_PARAGRAPH_CHARS;
                (short || SUBDIVISION.is_match(text))
                    .then(|| Element::nested("p", &["u"], &title_case(text)))
            }
            HeadingAction::Keep => None,
        }
    }
}

/// Lowercases `s`, then uppercases every letter that starts a word.
pub fn title_case(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut in_word = false;
    for ch in lower.chars() {
        if !in_word && ch.is_alphabetic() {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        in_word = ch.is_alphanumeric() || ch == '_';
    }
    out
}

/// Rewrites headings and short paragraphs in place. Returns how many
/// elements were replaced.
pub fn remap_headings(doc: &mut HtmlDocument) -> usize {
    let mut ancestors = Ancestors::default();
    remap_children(&mut doc.body_mut().children, &mut ancestors)
}

fn remap_children(children: &mut [Node], ancestors: &mut Ancestors) -> usize {
    let mut replaced = 0;
    for child in children.iter_mut() {
        let Node::Element(el) = child else {
            continue;
        };
        if let Some(replacement) = remap_element(el, ancestors) {
            *child = Node::Element(replacement);
            replaced += 1;
            continue;
        }
        ancestors.push(&el.tag);
        replaced += remap_children(&mut el.children, ancestors);
        ancestors.pop();
    }
    replaced
}

fn remap_element(el: &Element, ancestors: &Ancestors) -> Option<Element> {
    let action = HeadingKind::from_tag(&el.tag).action();
    if action == HeadingAction::Keep {
        return None;
    }
    let contained = CONTAINERS.iter().any(|c| el.is(c)) || ancestors.closest(&CONTAINERS).is_some();
    if contained {
        return None;
    }
    let text = el.text_content();
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    action.apply(text)
}
