//! Textual clean-up of converter output before it is parsed.
//!
//! Works on the raw string so it never fails, whatever the converter emits.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    // Start tags only; quoted values may contain '>'.
    static ref START_TAG: Regex =
        Regex::new(r#"<[A-Za-z][^\s/>]*(?:"[^"]*"|'[^']*'|[^'">])*>"#).unwrap();
    static ref ATTRIBUTE: Regex =
        Regex::new(r#"\s+([^\s"'>/=]+)(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?"#).unwrap();
    static ref SPAN_TAG: Regex =
        Regex::new(r#"(?i)</?span(?:[\s/](?:"[^"]*"|'[^']*'|[^'">])*)?>"#).unwrap();
    static ref EMPTY_PARAGRAPH: Regex = Regex::new(
        r#"(?i)<p(?:\s(?:"[^"]*"|'[^']*'|[^'">])*)?>(?:\s|&nbsp;|&#160;|&#x[aA]0;)*</p\s*>"#
    )
    .unwrap();
}

const STRIPPED_ATTRIBUTES: [&str; 3] = ["style", "class", "lang"];

fn is_stripped(name: &str) -> bool {
    STRIPPED_ATTRIBUTES
        .iter()
        .any(|a| a.eq_ignore_ascii_case(name))
}

fn strip_tag_attributes(tag: &str) -> String {
    let name_end = tag[1..]
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .map(|i| i + 1)
        .unwrap_or(tag.len());
    let (name, rest) = tag.split_at(name_end);
    let rest = ATTRIBUTE.replace_all(rest, |caps: &Captures| {
        if is_stripped(&caps[1]) {
            String::new()
        } else {
            caps[0].to_string()
        }
    });
    format!("{name}{rest}")
}

fn strip_attributes(html: &str) -> String {
    START_TAG
        .replace_all(html, |caps: &Captures| strip_tag_attributes(&caps[0]))
        .into_owned()
}

fn unwrap_spans(html: &str) -> String {
    SPAN_TAG.replace_all(html, "").into_owned()
}

fn remove_empty_paragraphs(html: &str) -> String {
    let mut out = html.to_string();
    loop {
        let next = EMPTY_PARAGRAPH.replace_all(&out, "").into_owned();
        if next == out {
            return out;
        }
        out = next;
    }
}

fn sanitize_once(html: &str) -> String {
    let out = strip_attributes(html);
    let out = unwrap_spans(&out);
    let out = remove_empty_paragraphs(&out);
    out.trim().to_string()
}

/// Strips presentation attributes, unwraps spans and drops empty paragraphs.
///
/// Every pass only removes text, so repeating until nothing changes
/// terminates and makes the result idempotent even when a removal splices
/// two fragments into new markup.
pub fn sanitize(html: &str) -> String {
    let mut out = sanitize_once(html);
    loop {
        let next = sanitize_once(&out);
        if next == out {
            return out;
        }
        out = next;
    }
}
