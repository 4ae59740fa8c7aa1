//! Indented, line-wrapped serialization of the final tree.
//!
//! Block elements start their own line, indented two spaces per level.
//! Runs of inline content are whitespace-collapsed and soft-wrapped at
//! [`WRAP_COLUMN`]; `<br>` always ends a line. Because every whitespace run
//! the printer emits is one the next parse collapses again, printing the
//! parse of printed output reproduces it exactly.

use crate::dom::{esc_text, is_raw_text, is_void, write_node, write_start_tag, Element, HtmlDocument, Node};
use crate::error::Result;
use std::fmt::Write;

pub const INDENT: &str = "  ";
pub const WRAP_COLUMN: usize = 120;

fn is_block(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "body"
            | "caption"
            | "center"
            | "dd"
            | "details"
            | "dialog"
            | "div"
            | "dl"
            | "dt"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "h7"
            | "header"
            | "hr"
            | "li"
            | "main"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "summary"
            | "table"
            | "tbody"
            | "td"
            | "textarea"
            | "tfoot"
            | "th"
            | "thead"
            | "tr"
            | "ul"
    )
}

fn is_preformatted(tag: &str) -> bool {
    matches!(tag.to_ascii_lowercase().as_str(), "pre" | "textarea") || is_raw_text(tag)
}

/// Whether the node can sit inside a wrapped line.
fn is_inline(node: &Node) -> bool {
    match node {
        Node::Text(_) | Node::Comment(_) => true,
        Node::Element(el) => {
            !is_block(&el.tag) && !is_raw_text(&el.tag) && el.children.iter().all(is_inline)
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Piece {
    Word(String),
    Break,
}

/// Splits inline content into unbreakable words. Markup sticks to the text
/// around it; only whitespace in text nodes separates words.
#[derive(Default)]
struct Pieces {
    pieces: Vec<Piece>,
    current: String,
}

impl Pieces {
    fn collect(nodes: &[&Node]) -> Vec<Piece> {
        let mut p = Pieces::default();
        for n in nodes {
            p.node(n);
        }
        p.boundary();
        if p.pieces.last() == Some(&Piece::Break) {
            p.pieces.pop();
        }
        p.pieces
    }

    fn boundary(&mut self) {
        if !self.current.is_empty() {
            self.pieces.push(Piece::Word(std::mem::take(&mut self.current)));
        }
    }

    fn node(&mut self, n: &Node) {
        match n {
            Node::Text(t) => {
                for ch in t.chars() {
                    if ch.is_ascii_whitespace() {
                        self.boundary();
                    } else {
                        self.current.push_str(&esc_text(ch.encode_utf8(&mut [0; 4])));
                    }
                }
            }
            Node::Comment(_) => write_node(&mut self.current, n, false),
            Node::Element(el) => {
                write_start_tag(&mut self.current, el);
                if is_void(&el.tag) {
                    if el.is("br") {
                        self.boundary();
                        self.pieces.push(Piece::Break);
                    }
                    return;
                }
                for c in &el.children {
                    self.node(c);
                }
                self.current.push_str("</");
                self.current.push_str(&el.tag);
                self.current.push('>');
            }
        }
    }
}

struct Printer {
    out: String,
}

impl Printer {
    fn line(&mut self, depth: usize, text: &str) -> Result<()> {
        writeln!(self.out, "{}{}", INDENT.repeat(depth), text)?;
        Ok(())
    }

    fn wrapped(&mut self, depth: usize, open: &str, pieces: &[Piece], close: &str) -> Result<()> {
        let indent = INDENT.repeat(depth);
        let continuation = INDENT.repeat(depth + 1);
        let mut line = format!("{indent}{open}");
        let mut has_word = false;
        for piece in pieces {
            match piece {
                Piece::Word(w) => {
                    if !has_word {
                        line.push_str(w);
                    } else if line.chars().count() + 1 + w.chars().count() > WRAP_COLUMN {
                        writeln!(self.out, "{line}")?;
                        line = format!("{continuation}{w}");
                    } else {
                        line.push(' ');
                        line.push_str(w);
                    }
                    has_word = true;
                }
                Piece::Break => {
                    writeln!(self.out, "{line}")?;
                    line = continuation.clone();
                    has_word = false;
                }
            }
        }
        line.push_str(close);
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    fn inline_run(&mut self, run: &[&Node], depth: usize) -> Result<()> {
        let pieces = Pieces::collect(run);
        if pieces.is_empty() {
            return Ok(());
        }
        self.wrapped(depth, "", &pieces, "")
    }

    fn children(&mut self, nodes: &[Node], depth: usize) -> Result<()> {
        let mut run: Vec<&Node> = Vec::new();
        for n in nodes {
            match n {
                Node::Element(el) if !is_inline(n) => {
                    self.inline_run(&run, depth)?;
                    run.clear();
                    self.element(el, depth)?;
                }
                _ => run.push(n),
            }
        }
        self.inline_run(&run, depth)
    }

    fn element(&mut self, el: &Element, depth: usize) -> Result<()> {
        let mut open = String::new();
        write_start_tag(&mut open, el);
        let close = format!("</{}>", el.tag);

        if is_void(&el.tag) {
            return self.line(depth, &open);
        }

        if is_preformatted(&el.tag) {
            let raw = is_raw_text(&el.tag);
            let mut body = String::new();
            // The parser drops one newline right after <pre>/<textarea>.
            if let Some(Node::Text(t)) = el.children.first() {
                if !raw && t.starts_with('\n') {
                    body.push('\n');
                }
            }
            for c in &el.children {
                write_node(&mut body, c, raw);
            }
            return self.line(depth, &format!("{open}{body}{close}"));
        }

        if el.children.iter().all(is_inline) {
            let run: Vec<&Node> = el.children.iter().collect();
            let pieces = Pieces::collect(&run);
            return self.wrapped(depth, &open, &pieces, &close);
        }

        self.line(depth, &open)?;
        self.children(&el.children, depth + 1)?;
        self.line(depth, &close)
    }
}

/// Serializes the body's children as indented HTML.
pub fn pretty_print(doc: &HtmlDocument) -> Result<String> {
    let mut printer = Printer { out: String::new() };
    printer.children(&doc.body().children, 0)?;
    let mut out = printer.out;
    while out.ends_with('\n') {
        out.pop();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pretty(html: &str) -> String {
        pretty_print(&HtmlDocument::parse(html).unwrap()).unwrap()
    }

    #[test]
    fn nests_blocks_with_two_space_indent() {
        let out = pretty("<div><h3><strong>T</strong></h3><ul><li>a</li><li>b</li></ul></div>");
        assert_eq!(
            out,
            "<div>\n  <h3><strong>T</strong></h3>\n  <ul>\n    <li>a</li>\n    <li>b</li>\n  </ul>\n</div>"
        );
    }

    #[test]
    fn collapses_inline_whitespace() {
        assert_eq!(pretty("<p>  a \n\t b <b>c</b>  </p>"), "<p>a b <b>c</b></p>");
    }

    #[test]
    fn wraps_long_lines_at_whitespace() {
        let words = vec!["word"; 60].join(" ");
        let out = pretty(&format!("<div><p>{words}</p></div>"));
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines.len() > 3);
        assert!(lines.iter().all(|l| l.chars().count() <= WRAP_COLUMN), "{out}");
        assert!(lines[1].starts_with("  <p>word"));
        assert!(lines[2].starts_with("    word"));
        assert!(out.contains("word</p>"));
    }

    #[test]
    fn never_breaks_inside_a_word() {
        let long = "x".repeat(200);
        assert_eq!(pretty(&format!("<p>{long}</p>")), format!("<p>{long}</p>"));
    }

    #[test]
    fn line_breaks_end_the_line() {
        assert_eq!(pretty("<p>one<br>two<br></p>"), "<p>one<br>\n  two<br></p>");
    }

    #[test]
    fn preformatted_content_is_verbatim() {
        assert_eq!(
            pretty("<div><pre>\n\n  keep   this\n</pre></div>"),
            "<div>\n  <pre>\n\n  keep   this\n</pre>\n</div>"
        );
    }

    #[test]
    fn mixed_content_puts_inline_runs_on_their_own_lines() {
        assert_eq!(
            pretty("<div>intro <p>x</p> outro</div>"),
            "<div>\n  intro\n  <p>x</p>\n  outro\n</div>"
        );
    }

    #[test]
    fn escapes_text_and_keeps_attributes() {
        assert_eq!(
            pretty(r#"<p style="text-align: center;">a &amp; b&nbsp;<img src="x" alt="&quot;"></p>"#),
            r#"<p style="text-align: center;">a &amp; b&nbsp;<img src="x" alt="&quot;"></p>"#
        );
    }

    #[test]
    fn empty_block_prints_on_one_line() {
        assert_eq!(pretty("<div></div><hr>"), "<div></div>\n<hr>");
    }

    #[test]
    fn printing_is_idempotent() {
        let words = vec!["palabra"; 50].join(" ");
        let inputs = [
            format!("<h3><strong>TITLE</strong></h3><p>{words}</p>"),
            "<div>intro <p>x<br>y</p> outro<!-- c --></div>".to_string(),
            "<table><tbody><tr><td>a</td><td><p>b</p></td></tr></tbody></table>".to_string(),
            "<ul><li><h1>Keep</h1></li><li>t <b>b</b></li></ul>".to_string(),
            "<pre>\nx\n  y</pre><p><a href=\"#\"><div>block in inline</div></a></p>".to_string(),
            format!("<p>{}<img src=\"data:image/png;base64,{}\"> tail</p>", "a ".repeat(70), "A".repeat(300)),
        ];
        for html in inputs {
            let once = pretty(&html);
            assert_eq!(pretty(&once), once, "{html}");
        }
    }
}
