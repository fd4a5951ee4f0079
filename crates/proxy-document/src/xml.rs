//! quick-xml adapters: a pull source producing [`DocEvent`]s and a push sink
//! serializing them.

use std::borrow::Cow;
use std::collections::HashSet;
use std::io::{BufRead, Write};

use quick_xml::events::attributes::Attribute as XmlAttribute;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};

use crate::error::{DocumentError, DocumentResult};
use crate::event::{Attribute, DocEvent, EventSink, Property, PROPERTY_ELEMENT};

/// Pulls [`DocEvent`]s out of an XML byte stream.
///
/// Whitespace-only text between elements is dropped; [`XmlSink`] re-indents.
/// The last event of a well-formed stream is [`DocEvent::EndDocument`]. A
/// stream that stops with elements still open, or never opens a root
/// element, ends in an error instead.
pub struct XmlEventSource<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    text_buf: Vec<u8>,
    open: Vec<String>,
    seen_root: bool,
    entities: HashSet<String>,
    finished: bool,
}

impl<R: BufRead> XmlEventSource<R> {
    pub fn new(input: R) -> Self {
        Self {
            reader: Reader::from_reader(input),
            buf: Vec::new(),
            text_buf: Vec::new(),
            open: Vec::new(),
            seen_root: false,
            entities: HashSet::new(),
            finished: false,
        }
    }

    fn read_next(&mut self) -> DocumentResult<DocEvent> {
        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf)? {
                Event::Decl(decl) => DocEvent::StartDocument {
                    version: utf8(&decl.version()?)?,
                    encoding: decl.encoding().transpose()?.map(|e| utf8(&e)).transpose()?,
                    standalone: decl.standalone().transpose()?.map(|s| utf8(&s)).transpose()?,
                },
                Event::DocType(text) => {
                    let text = utf8(&text)?;
                    self.entities = declared_entities(&text);
                    DocEvent::DocType(text)
                }
                Event::Start(start) if start.name().as_ref() == PROPERTY_ELEMENT.as_bytes() => {
                    self.seen_root = true;
                    let name = property_name(&start, &self.entities)?;
                    let value = read_property_text(&mut self.reader, &mut self.text_buf, &self.entities)?;
                    DocEvent::Property(Property::new(name, value))
                }
                Event::Empty(start) if start.name().as_ref() == PROPERTY_ELEMENT.as_bytes() => {
                    self.seen_root = true;
                    DocEvent::Property(Property::new(property_name(&start, &self.entities)?, String::new()))
                }
                Event::Start(start) => {
                    let name = utf8(start.name().as_ref())?;
                    self.seen_root = true;
                    self.open.push(name.clone());
                    DocEvent::StartElement {
                        name,
                        attributes: attributes(&start, &self.entities)?,
                    }
                }
                Event::Empty(start) => {
                    self.seen_root = true;
                    DocEvent::EmptyElement {
                        name: utf8(start.name().as_ref())?,
                        attributes: attributes(&start, &self.entities)?,
                    }
                }
                Event::End(end) => {
                    self.open.pop();
                    DocEvent::EndElement {
                        name: utf8(end.name().as_ref())?,
                    }
                }
                Event::Text(text) => {
                    if text.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    let raw = utf8(&text)?;
                    unescape_text(&raw, &self.entities)?;
                    DocEvent::Characters(raw)
                }
                Event::CData(data) => DocEvent::CData(utf8(&data)?),
                Event::Comment(text) => DocEvent::Comment(utf8(&text)?),
                Event::PI(pi) => DocEvent::ProcessingInstruction(utf8(&pi)?),
                Event::Eof => {
                    if let Some(name) = self.open.pop() {
                        return Err(DocumentError::UnexpectedEof(name));
                    }
                    if !self.seen_root {
                        return Err(DocumentError::NoRootElement);
                    }
                    DocEvent::EndDocument
                }
            };
            return Ok(event);
        }
    }
}

impl<R: BufRead> Iterator for XmlEventSource<R> {
    type Item = DocumentResult<DocEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.read_next();
        if matches!(result, Ok(DocEvent::EndDocument) | Err(_)) {
            self.finished = true;
        }
        Some(result)
    }
}

fn utf8(bytes: &[u8]) -> DocumentResult<String> {
    Ok(std::str::from_utf8(bytes)?.to_string())
}

/// General entity names declared in the internal subset of a DOCTYPE.
fn declared_entities(doctype: &str) -> HashSet<String> {
    doctype
        .split("<!ENTITY")
        .skip(1)
        .filter_map(|decl| {
            let decl = decl.trim_start();
            if decl.starts_with('%') {
                return None;
            }
            decl.split(|c: char| c.is_whitespace() || c == '>')
                .next()
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        })
        .collect()
}

/// Resolve predefined and character references; references to declared
/// entities stay as written. Anything else is an error.
fn unescape_text(raw: &str, entities: &HashSet<String>) -> DocumentResult<String> {
    let mut value = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        value.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let end = tail.find(';').map_or(tail.len(), |i| i + 1);
        let reference = &tail[..end];
        if entity_name(reference).is_some_and(|name| entities.contains(name)) {
            value.push_str(reference);
        } else {
            value.push_str(&quick_xml::escape::unescape(reference)?);
        }
        rest = &tail[end..];
    }
    value.push_str(rest);
    Ok(value)
}

fn entity_name(reference: &str) -> Option<&str> {
    reference.strip_prefix('&')?.split_once(';').map(|(name, _)| name)
}

/// Escape `value` for output, leaving references to declared entities intact.
///
/// Attribute values also get their whitespace controls as character
/// references so a reader does not normalize them to spaces.
fn escape_text(value: &str, entities: &HashSet<String>, attribute: bool) -> String {
    let mut escaped = String::with_capacity(value.len());
    for (i, c) in value.char_indices() {
        match c {
            '&' if entity_name(&value[i..]).is_some_and(|name| entities.contains(name)) => escaped.push('&'),
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\r' => escaped.push_str("&#13;"),
            '"' if attribute => escaped.push_str("&quot;"),
            '\n' if attribute => escaped.push_str("&#10;"),
            '\t' if attribute => escaped.push_str("&#9;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn property_name(start: &BytesStart<'_>, entities: &HashSet<String>) -> DocumentResult<String> {
    match start.try_get_attribute("name")? {
        Some(attr) => unescape_text(std::str::from_utf8(&attr.value)?, entities),
        None => Ok(String::new()),
    }
}

fn attributes(start: &BytesStart<'_>, entities: &HashSet<String>) -> DocumentResult<Vec<Attribute>> {
    start
        .attributes()
        .map(|attr| {
            let attr = attr?;
            Ok(Attribute::new(
                utf8(attr.key.as_ref())?,
                unescape_text(std::str::from_utf8(&attr.value)?, entities)?,
            ))
        })
        .collect()
}

/// Read the text content of a `property` element up to its end tag.
fn read_property_text<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
    entities: &HashSet<String>,
) -> DocumentResult<String> {
    let mut value = String::new();
    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Text(text) => value.push_str(&unescape_text(std::str::from_utf8(&text)?, entities)?),
            Event::CData(data) => value.push_str(std::str::from_utf8(&data)?),
            Event::End(_) => return Ok(value),
            Event::Start(e) | Event::Empty(e) => {
                return Err(DocumentError::UnexpectedElement {
                    element: utf8(e.name().as_ref())?,
                    parent: PROPERTY_ELEMENT.to_string(),
                })
            }
            Event::Eof => return Err(DocumentError::UnexpectedEof(PROPERTY_ELEMENT.to_string())),
            // Comments and PIs inside a value carry no text
            _ => {}
        }
    }
}

/// Serializes [`DocEvent`]s as indented XML.
pub struct XmlSink<W: Write> {
    writer: Writer<W>,
    entities: HashSet<String>,
}

impl<W: Write> XmlSink<W> {
    pub fn new(output: W) -> Self {
        Self {
            writer: Writer::new_with_indent(output, b' ', 2),
            entities: HashSet::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn start_tag<'a>(&self, name: &'a str, attributes: &[Attribute]) -> BytesStart<'a> {
        let mut start = BytesStart::new(name);
        for attr in attributes {
            start.push_attribute(XmlAttribute {
                key: QName(attr.name.as_bytes()),
                value: Cow::Owned(escape_text(&attr.value, &self.entities, true).into_bytes()),
            });
        }
        start
    }
}

impl<W: Write> EventSink for XmlSink<W> {
    fn emit(&mut self, event: DocEvent) -> DocumentResult<()> {
        match event {
            DocEvent::StartDocument {
                version,
                encoding,
                standalone,
            } => self.writer.write_event(Event::Decl(BytesDecl::new(
                &version,
                encoding.as_deref(),
                standalone.as_deref(),
            )))?,
            DocEvent::DocType(text) => {
                self.entities = declared_entities(&text);
                self.writer
                    .write_event(Event::DocType(BytesText::from_escaped(text)))?
            }
            DocEvent::StartElement { name, attributes } => {
                let start = self.start_tag(&name, &attributes);
                self.writer.write_event(Event::Start(start))?
            }
            DocEvent::EmptyElement { name, attributes } => {
                let start = self.start_tag(&name, &attributes);
                self.writer.write_event(Event::Empty(start))?
            }
            DocEvent::EndElement { name } => self.writer.write_event(Event::End(BytesEnd::new(name)))?,
            DocEvent::Property(Property { name, value }) => {
                let start = self.start_tag(PROPERTY_ELEMENT, &[Attribute::new("name", name)]);
                if value.is_empty() {
                    self.writer.write_event(Event::Empty(start))?;
                } else {
                    let text = escape_text(&value, &self.entities, false);
                    self.writer.write_event(Event::Start(start))?;
                    self.writer.write_event(Event::Text(BytesText::from_escaped(text)))?;
                    self.writer
                        .write_event(Event::End(BytesEnd::new(PROPERTY_ELEMENT)))?;
                }
            }
            DocEvent::Characters(text) => self
                .writer
                .write_event(Event::Text(BytesText::from_escaped(text)))?,
            DocEvent::CData(data) => self.writer.write_event(Event::CData(BytesCData::new(data)))?,
            DocEvent::Comment(text) => self
                .writer
                .write_event(Event::Comment(BytesText::from_escaped(text)))?,
            DocEvent::ProcessingInstruction(text) => {
                self.writer.write_event(Event::PI(BytesPI::new(text)))?
            }
            DocEvent::EndDocument => self.writer.get_mut().write_all(b"\n")?,
        }
        Ok(())
    }
}
