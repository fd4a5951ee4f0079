//! Document rewrite errors.

use quick_xml::events::attributes::AttrError;
use thiserror::Error;

pub type DocumentResult<T> = Result<T, DocumentError>;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Bad character or entity reference: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("XML attribute error: {0}")]
    Attribute(#[from] AttrError),

    #[error("Invalid UTF-8 in document: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Unexpected element <{element}> inside <{parent}>")]
    UnexpectedElement { element: String, parent: String },

    #[error("Document ended inside <{0}>")]
    UnexpectedEof(String),

    #[error("Document has no root element")]
    NoRootElement,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocumentError {
    /// True when the input document is malformed, as opposed to a failure
    /// of the output side.
    pub fn is_parse_error(&self) -> bool {
        !matches!(self, DocumentError::Io(_))
    }
}
