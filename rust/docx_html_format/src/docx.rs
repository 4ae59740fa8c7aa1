//! `.docx` reader producing the intermediate HTML the pipeline expects.
//!
//! Only the parts of WordprocessingML that survive into the final page are
//! read: paragraph styles, run emphasis, breaks, hyperlinks, numbered
//! paragraphs, tables and embedded pictures.

use crate::convert::{content_type_for, inline_image, DocumentConverter, StyleMap};
use crate::dom::{esc_attr, esc_text};
use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const RELS_PART: &str = "word/_rels/document.xml.rels";

#[derive(Clone, Debug, Default)]
pub struct DocxConverter {
    styles: StyleMap,
}

impl DocxConverter {
    pub fn new(styles: StyleMap) -> Self {
        Self { styles }
    }
}

impl DocumentConverter for DocxConverter {
    fn convert(&self, bytes: &[u8]) -> Result<String> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let document = read_part(&mut archive, DOCUMENT_PART)?
            .ok_or_else(|| Error::Conversion(format!("not a Word document: missing {DOCUMENT_PART}")))?;
        let document = String::from_utf8_lossy(&document).into_owned();

        let style_names = match read_part(&mut archive, STYLES_PART)? {
            Some(xml) => parse_style_names(&String::from_utf8_lossy(&xml))?,
            None => HashMap::new(),
        };
        let rels = match read_part(&mut archive, RELS_PART)? {
            Some(xml) => parse_relationships(&String::from_utf8_lossy(&xml))?,
            None => HashMap::new(),
        };
        let images = load_images(&mut archive, &rels)?;
        debug!(
            styles = style_names.len(),
            relationships = rels.len(),
            images = images.len(),
            "read docx parts"
        );

        let mut body = BodyWriter::new(&self.styles, &style_names, &rels, &images);
        body.write(&document)?;
        Ok(body.finish())
    }
}

fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)
        .map_err(|e| Error::Conversion(format!("read {name}: {e}")))?;
    Ok(Some(buf))
}

fn attr(e: &BytesStart, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Style id → display name, from `word/styles.xml`.
fn parse_style_names(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut names = HashMap::new();
    let mut current: Option<String> = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"style" => {
                current = attr(&e, b"styleId");
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"name" => {
                if let (Some(id), Some(name)) = (current.as_ref(), attr(&e, b"val")) {
                    names.insert(id.clone(), name);
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"style" => current = None,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(names)
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Relationship {
    target: String,
    kind: String,
    external: bool,
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, Relationship>> {
    let mut reader = Reader::from_str(xml);
    let mut rels = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let (Some(id), Some(target)) = (attr(&e, b"Id"), attr(&e, b"Target")) else {
                    continue;
                };
                let rel = Relationship {
                    target,
                    kind: attr(&e, b"Type").unwrap_or_default(),
                    external: attr(&e, b"TargetMode").is_some_and(|m| m.eq_ignore_ascii_case("External")),
                };
                rels.insert(id, rel);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

/// Zip path of an internal relationship target, which is relative to `word/`.
fn part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("word/{}", target.trim_start_matches("./")),
    }
}

fn load_images(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    rels: &HashMap<String, Relationship>,
) -> Result<HashMap<String, (String, Vec<u8>)>> {
    let mut images = HashMap::new();
    for (id, rel) in rels {
        if rel.external || !rel.kind.ends_with("/image") {
            continue;
        }
        let path = part_path(&rel.target);
        match read_part(archive, &path)? {
            Some(bytes) => {
                images.insert(id.clone(), (path, bytes));
            }
            None => warn!(%path, "image relationship points at a missing part"),
        }
    }
    Ok(images)
}

#[derive(Clone, Copy, Debug, Default)]
struct RunStyle {
    bold: bool,
    italic: bool,
    underline: bool,
}

impl RunStyle {
    fn wrap(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len() + 32);
        let tags: Vec<&str> = [
            (self.bold, "strong"),
            (self.italic, "em"),
            (self.underline, "u"),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .map(|(_, t)| t)
        .collect();
        for t in &tags {
            out.push('<');
            out.push_str(t);
            out.push('>');
        }
        out.push_str(html);
        for t in tags.iter().rev() {
            out.push_str("</");
            out.push_str(t);
            out.push('>');
        }
        out
    }
}

fn toggle_on(e: &BytesStart) -> bool {
    !matches!(
        attr(e, b"val").as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("0" | "false" | "none")
    )
}

#[derive(Debug, Default)]
struct Paragraph {
    style: Option<String>,
    numbered: bool,
    html: String,
}

#[derive(Debug, Default)]
struct Picture {
    rel_id: Option<String>,
    alt: Option<String>,
}

struct BodyWriter<'a> {
    styles: &'a StyleMap,
    style_names: &'a HashMap<String, String>,
    rels: &'a HashMap<String, Relationship>,
    images: &'a HashMap<String, (String, Vec<u8>)>,
    out: String,
    // One entry per open container (body, then each table cell): whether a
    // list is currently open in it.
    lists: Vec<bool>,
    paragraph: Option<Paragraph>,
    run: RunStyle,
    links: Vec<bool>,
    picture: Option<Picture>,
    in_ppr: bool,
    in_rpr: bool,
    in_text: bool,
    skip: usize,
}

impl<'a> BodyWriter<'a> {
    fn new(
        styles: &'a StyleMap,
        style_names: &'a HashMap<String, String>,
        rels: &'a HashMap<String, Relationship>,
        images: &'a HashMap<String, (String, Vec<u8>)>,
    ) -> Self {
        Self {
            styles,
            style_names,
            rels,
            images,
            out: String::new(),
            lists: vec![false],
            paragraph: None,
            run: RunStyle::default(),
            links: Vec::new(),
            picture: None,
            in_ppr: false,
            in_rpr: false,
            in_text: false,
            skip: 0,
        }
    }

    fn write(&mut self, xml: &str) -> Result<()> {
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event()? {
                Event::Start(e) => self.open(&e),
                Event::Empty(e) => {
                    self.open(&e);
                    self.close(e.local_name().as_ref());
                }
                Event::End(e) => self.close(e.local_name().as_ref()),
                Event::Text(t) if self.in_text && self.skip == 0 => {
                    let text = t.unescape()?;
                    self.push_run_html(&esc_text(&text));
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(())
    }

    fn finish(mut self) -> String {
        self.close_list();
        self.out
    }

    fn open(&mut self, e: &BytesStart) {
        let name = e.local_name();
        let name = name.as_ref();
        if matches!(name, b"txbxContent" | b"Fallback") {
            self.skip += 1;
            return;
        }
        if self.skip > 0 {
            return;
        }
        match name {
            b"p" => self.paragraph = Some(Paragraph::default()),
            b"pPr" => self.in_ppr = true,
            b"pStyle" if self.in_ppr => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.style = attr(e, b"val");
                }
            }
            b"numPr" if self.in_ppr => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.numbered = true;
                }
            }
            b"r" => self.run = RunStyle::default(),
            b"rPr" if !self.in_ppr => self.in_rpr = true,
            b"b" if self.in_rpr => self.run.bold = toggle_on(e),
            b"i" if self.in_rpr => self.run.italic = toggle_on(e),
            b"u" if self.in_rpr => self.run.underline = toggle_on(e),
            b"t" => self.in_text = true,
            b"tab" if !self.in_ppr => self.push_run_html("\t"),
            b"br" | b"cr" => {
                let page = attr(e, b"type").is_some_and(|t| t == "page");
                if !page {
                    self.push_html("<br />");
                }
            }
            b"hyperlink" => self.open_link(e),
            b"drawing" | b"pict" => self.picture = Some(Picture::default()),
            b"docPr" => {
                if let Some(p) = self.picture.as_mut() {
                    p.alt = attr(e, b"descr").filter(|d| !d.is_empty()).or(p.alt.take());
                }
            }
            b"blip" => {
                if let Some(p) = self.picture.as_mut() {
                    p.rel_id = attr(e, b"embed");
                }
            }
            b"imagedata" => {
                if let Some(p) = self.picture.as_mut() {
                    p.rel_id = attr(e, b"id");
                    p.alt = attr(e, b"title").or(p.alt.take());
                }
            }
            b"tbl" => {
                self.close_list();
                self.out.push_str("<table>");
            }
            b"tr" => self.out.push_str("<tr>"),
            b"tc" => {
                self.out.push_str("<td>");
                self.lists.push(false);
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        if matches!(name, b"txbxContent" | b"Fallback") {
            self.skip = self.skip.saturating_sub(1);
            return;
        }
        if self.skip > 0 {
            return;
        }
        match name {
            b"p" => self.end_paragraph(),
            b"pPr" => self.in_ppr = false,
            b"rPr" => self.in_rpr = false,
            b"t" => self.in_text = false,
            b"hyperlink" => {
                if self.links.pop() == Some(true) {
                    self.push_html("</a>");
                }
            }
            b"drawing" | b"pict" => self.end_picture(),
            b"tbl" => self.out.push_str("</table>"),
            b"tr" => self.out.push_str("</tr>"),
            b"tc" => {
                self.close_list();
                self.lists.pop();
                self.out.push_str("</td>");
            }
            _ => {}
        }
    }

    fn push_html(&mut self, html: &str) {
        if let Some(p) = self.paragraph.as_mut() {
            p.html.push_str(html);
        }
    }

    fn push_run_html(&mut self, html: &str) {
        let wrapped = self.run.wrap(html);
        self.push_html(&wrapped);
    }

    fn open_link(&mut self, e: &BytesStart) {
        let href = attr(e, b"id")
            .and_then(|id| self.rels.get(&id))
            .filter(|rel| rel.external)
            .map(|rel| rel.target.clone())
            .or_else(|| attr(e, b"anchor").map(|a| format!("#{a}")));
        match href {
            Some(href) => {
                self.push_html(&format!("<a href=\"{}\">", esc_attr(&href)));
                self.links.push(true);
            }
            None => self.links.push(false),
        }
    }

    fn end_picture(&mut self) {
        let Some(picture) = self.picture.take() else {
            return;
        };
        let Some(rel_id) = picture.rel_id else {
            return;
        };
        let Some((path, bytes)) = self.images.get(&rel_id) else {
            warn!(%rel_id, "picture references an unknown image");
            return;
        };
        let image = inline_image(bytes, content_type_for(path), picture.alt.as_deref());
        let html = format!(
            "<img src=\"{}\" alt=\"{}\" />",
            esc_attr(&image.src),
            esc_attr(&image.alt)
        );
        self.push_html(&html);
    }

    fn tag_for(&self, style: &str) -> Option<&'static str> {
        self.styles.tag_for(style).or_else(|| {
            self.style_names
                .get(style)
                .and_then(|name| self.styles.tag_for(name))
        })
    }

    fn end_paragraph(&mut self) {
        let Some(p) = self.paragraph.take() else {
            return;
        };
        self.in_ppr = false;
        if p.html.trim().is_empty() {
            return;
        }
        let heading = p.style.as_deref().and_then(|s| self.tag_for(s));
        match heading {
            None if p.numbered => {
                self.open_list();
                self.out.push_str("<li>");
                self.out.push_str(&p.html);
                self.out.push_str("</li>");
            }
            _ => {
                self.close_list();
                let tag = heading.unwrap_or("p");
                self.out.push_str(&format!("<{tag}>{}</{tag}>", p.html));
            }
        }
    }

    fn open_list(&mut self) {
        if let Some(open) = self.lists.last_mut() {
            if !*open {
                *open = true;
                self.out.push_str("<ul>");
            }
        }
    }

    fn close_list(&mut self) {
        if let Some(open) = self.lists.last_mut() {
            if *open {
                *open = false;
                self.out.push_str("</ul>");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const W_NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main""#;

    fn build_docx(body: &str, extra: &[(&str, &[u8])]) -> Vec<u8> {
        let document = format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {W_NS}><w:body>{body}</w:body></w:document>"#);
        let mut buf = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buf));
            let opt = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
            zip.start_file(DOCUMENT_PART, opt).unwrap();
            zip.write_all(document.as_bytes()).unwrap();
            for (name, bytes) in extra {
                zip.start_file(*name, opt).unwrap();
                zip.write_all(bytes).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    fn convert(body: &str, extra: &[(&str, &[u8])]) -> String {
        DocxConverter::default().convert(&build_docx(body, extra)).unwrap()
    }

    fn para(style: &str, text: &str) -> String {
        format!(r#"<w:p><w:pPr><w:pStyle w:val="{style}"/></w:pPr><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
    }

    #[test]
    fn maps_heading_styles() {
        let body = [para("Heading1", "One"), para("Heading7", "Seven"), para("Normal", "Body")].concat();
        assert_eq!(convert(&body, &[]), "<h1>One</h1><h7>Seven</h7><p>Body</p>");
    }

    #[test]
    fn resolves_style_display_names() {
        let styles: &[u8] = br#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:styleId="Titulo2"><w:name w:val="heading 2"/></w:style></w:styles>"#;
        let out = convert(&para("Titulo2", "Dos"), &[(STYLES_PART, styles)]);
        assert_eq!(out, "<h2>Dos</h2>");
    }

    #[test]
    fn run_emphasis_and_breaks() {
        let body = r#"<w:p><w:r><w:rPr><w:b/><w:u w:val="single"/></w:rPr><w:t>Bold</w:t></w:r><w:r><w:rPr><w:i/><w:b w:val="0"/></w:rPr><w:t xml:space="preserve"> it &amp; </w:t></w:r><w:r><w:br/><w:tab/><w:t>x</w:t></w:r></w:p>"#;
        assert_eq!(
            convert(body, &[]),
            "<p><strong><u>Bold</u></strong><em> it &amp; </em><br />\tx</p>"
        );
    }

    #[test]
    fn paragraph_mark_formatting_is_ignored() {
        let body = r#"<w:p><w:pPr><w:rPr><w:b/></w:rPr></w:pPr><w:r><w:t>plain</w:t></w:r></w:p>"#;
        assert_eq!(convert(body, &[]), "<p>plain</p>");
    }

    #[test]
    fn skips_empty_paragraphs() {
        assert_eq!(convert("<w:p/><w:p><w:r><w:t>  </w:t></w:r></w:p>", &[]), "");
    }

    #[test]
    fn groups_numbered_paragraphs_into_lists() {
        let item = |t: &str| {
            format!(r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr></w:pPr><w:r><w:t>{t}</w:t></w:r></w:p>"#)
        };
        let body = [item("a"), item("b"), para("Normal", "after")].concat();
        assert_eq!(convert(&body, &[]), "<ul><li>a</li><li>b</li></ul><p>after</p>");
    }

    #[test]
    fn converts_tables() {
        let body = r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>a</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>b</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#;
        assert_eq!(convert(body, &[]), "<table><tr><td><p>a</p></td><td><p>b</p></td></tr></table>");
    }

    #[test]
    fn external_hyperlinks_become_anchors() {
        let rels: &[u8] = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/></Relationships>"#;
        let body = r#"<w:p><w:hyperlink r:id="rId9"><w:r><w:t>site</w:t></w:r></w:hyperlink></w:p>"#;
        assert_eq!(
            convert(body, &[(RELS_PART, rels)]),
            r#"<p><a href="https://example.com/?a=1&amp;b=2">site</a></p>"#
        );
    }

    #[test]
    fn inlines_embedded_pictures() {
        let rels: &[u8] = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/></Relationships>"#;
        let body = r#"<w:p><w:r><w:drawing><wp:inline><wp:docPr id="1" name="Picture 1" descr="Logo El contenido generado por IA puede ser incorrecto."/><a:graphic><a:graphicData><a:blip r:embed="rId5"/></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#;
        let out = convert(body, &[(RELS_PART, rels), ("word/media/image1.png", &b"abc"[..])]);
        assert_eq!(out, r#"<p><img src="data:image/png;base64,YWJj" alt="Logo" /></p>"#);
    }

    #[test]
    fn text_box_content_is_skipped() {
        let body = r#"<w:p><w:r><w:t>outer</w:t></w:r><w:r><w:pict><w:txbxContent><w:p><w:r><w:t>inner</w:t></w:r></w:p></w:txbxContent></w:pict></w:r></w:p>"#;
        assert_eq!(convert(body, &[]), "<p>outer</p>");
    }

    #[test]
    fn explicit_style_map_converts_like_the_default() {
        let bytes = build_docx(&para("Heading 3", "Tres"), &[]);
        let out = DocxConverter::new(StyleMap::default()).convert(&bytes).unwrap();
        assert_eq!(out, "<h3>Tres</h3>");
    }

    #[test]
    fn rejects_non_zip_input() {
        let err = DocxConverter::default().convert(b"plain text").unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }

    #[test]
    fn rejects_zip_without_document() {
        let mut buf = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("hello.txt", SimpleFileOptions::default()).unwrap();
            zip.write_all(b"hi").unwrap();
            zip.finish().unwrap();
        }
        let err = DocxConverter::default().convert(&buf).unwrap_err();
        assert!(err.to_string().contains("word/document.xml"), "{err}");
    }

    #[test]
    fn part_paths_resolve_relative_to_word() {
        assert_eq!(part_path("media/image1.png"), "word/media/image1.png");
        assert_eq!(part_path("/word/media/x.jpeg"), "word/media/x.jpeg");
    }
}
