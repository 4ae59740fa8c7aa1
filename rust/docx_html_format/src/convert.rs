//! The seam between document readers and the HTML pipeline.

use crate::error::Result;
use crate::pipeline::process;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Word appends this notice to alt text it generated automatically.
    static ref GENERATED_ALT_NOTICE: Regex =
        Regex::new(r"(?is)El contenido generado por IA.*$").unwrap();
}

/// Turns document bytes into intermediate HTML.
pub trait DocumentConverter {
    fn convert(&self, bytes: &[u8]) -> Result<String>;
}

/// Paragraph style → tag table used by document readers.
#[derive(Clone, Debug)]
pub struct StyleMap {
    entries: Vec<(String, &'static str)>,
}

impl Default for StyleMap {
    fn default() -> Self {
        let entries = [
            ("Heading1", "h1"),
            ("Heading2", "h2"),
            ("Heading3", "h3"),
            ("Heading4", "h4"),
            ("Heading5", "h5"),
            ("Heading6", "h6"),
            ("Heading7", "h7"),
        ]
        .into_iter()
        .map(|(style, tag)| (normalize_style(style), tag))
        .collect();
        Self { entries }
    }
}

fn normalize_style(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

impl StyleMap {
    /// Tag for a paragraph style id or display name ("Heading1", "heading 1").
    pub fn tag_for(&self, style: &str) -> Option<&'static str> {
        let key = normalize_style(style);
        self.entries
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, tag)| *tag)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineImage {
    pub src: String,
    pub alt: String,
}

/// Embeds image bytes as a base64 data URI and cleans up its alt text.
pub fn inline_image(bytes: &[u8], content_type: &str, alt: Option<&str>) -> InlineImage {
    let ext = content_type
        .split_once('/')
        .map(|(_, sub)| sub.trim())
        .filter(|sub| !sub.is_empty())
        .unwrap_or("png");
    let alt = GENERATED_ALT_NOTICE.replace(alt.unwrap_or_default(), "");
    InlineImage {
        src: format!("data:image/{ext};base64,{}", STANDARD.encode(bytes)),
        alt: alt.trim().to_string(),
    }
}

/// Content type for a media part, from its file extension.
pub fn content_type_for(path: &str) -> &'static str {
    let ext = path.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase()).unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        _ => "application/octet-stream",
    }
}

/// Converts a document and formats the result.
pub fn convert_document(converter: &dyn DocumentConverter, bytes: &[u8]) -> Result<String> {
    let raw = converter.convert(bytes)?;
    process(&raw)
}
