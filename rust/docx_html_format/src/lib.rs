//! Post-processing for HTML produced from Word documents.
//!
//! [`process`] cleans up converter output (stray attributes, spans, empty
//! paragraphs), rewrites headings into the house style, centers image
//! paragraphs and pretty-prints the result. [`DocxConverter`] reads the
//! `.docx` package itself.

mod convert;
mod docx;
pub mod dom;
mod error;
pub mod images;
mod pipeline;
pub mod pretty;
pub mod remap;
pub mod sanitize;

pub use convert::{
    content_type_for, convert_document, inline_image, DocumentConverter, InlineImage, StyleMap,
};
pub use docx::DocxConverter;
pub use error::{Error, Result};
pub use pipeline::process;
