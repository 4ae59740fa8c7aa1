use thiserror::Error;

/// Failures surfaced by conversion and formatting.
///
/// The display string of every variant is what the HTTP layer reports to the
/// client, so conversion messages are passed through unchanged.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Conversion(String),

    #[error("could not parse sanitized HTML: {0}")]
    Parse(String),

    #[error("could not serialize formatted HTML")]
    Serialization(#[from] std::fmt::Error),
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Conversion(e.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Conversion(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
