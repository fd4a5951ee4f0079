//! Library-independent document events.

use crate::error::DocumentResult;

/// Name of the leaf element carrying a property.
pub const PROPERTY_ELEMENT: &str = "property";

/// Element attribute with its unescaped value.
///
/// References to entities declared in the document type are kept as
/// `&name;`, in attribute and property values alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A complete `<property name="...">value</property>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub value: String,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One step of a document, in document order.
///
/// Property elements arrive as a single [`DocEvent::Property`]; every other
/// construct maps one-to-one onto the markup it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocEvent {
    /// XML declaration
    StartDocument {
        version: String,
        encoding: Option<String>,
        standalone: Option<String>,
    },
    /// Raw DTD content
    DocType(String),
    StartElement {
        name: String,
        attributes: Vec<Attribute>,
    },
    /// Self-closing element
    EmptyElement {
        name: String,
        attributes: Vec<Attribute>,
    },
    EndElement {
        name: String,
    },
    Property(Property),
    /// Character data exactly as escaped in the source, entity references
    /// included
    Characters(String),
    CData(String),
    /// Raw comment text
    Comment(String),
    /// Raw processing instruction, target and data
    ProcessingInstruction(String),
    EndDocument,
}

impl DocEvent {
    /// Events that close the current property window.
    pub fn ends_property_scope(&self) -> bool {
        matches!(
            self,
            DocEvent::StartElement { .. }
                | DocEvent::EmptyElement { .. }
                | DocEvent::EndElement { .. }
                | DocEvent::EndDocument
        )
    }
}

/// Push-style consumer of document events.
pub trait EventSink {
    fn emit(&mut self, event: DocEvent) -> DocumentResult<()>;
}

impl EventSink for Vec<DocEvent> {
    fn emit(&mut self, event: DocEvent) -> DocumentResult<()> {
        self.push(event);
        Ok(())
    }
}
