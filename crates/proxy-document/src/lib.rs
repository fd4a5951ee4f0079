//! Streaming rewrite of saved project documents.
//!
//! Property elements are buffered per enclosing element so that a proxy
//! marker anywhere among siblings can change how `resource` is written back.
//! The rewrite state machine works on [`DocEvent`]s and knows nothing about
//! the XML library; [`xml`] adapts quick-xml on both ends.

pub mod error;
pub mod event;
pub mod filter;
pub mod rewriter;
pub mod xml;

pub use error::{DocumentError, DocumentResult};
pub use event::{Attribute, DocEvent, EventSink, Property};
pub use filter::{filter_document, rewrite_document, rewrite_str, RewriteOutcome};
pub use rewriter::{relativize, rewrite_properties, PropertyRewriter, RewriteState};
pub use xml::{XmlEventSource, XmlSink};
