//! Proxy-to-original property rewrite state machine.

use std::mem;

use proxy_models::keys;
use tracing::debug;

use crate::error::DocumentResult;
use crate::event::{DocEvent, EventSink, Property};

/// Speed used for time-remapped producers without `warp_speed`.
const DEFAULT_WARP_SPEED: &str = "1";

/// Whether sibling properties are being held back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RewriteState {
    /// Nothing buffered; events pass straight through
    #[default]
    Idle,
    /// Properties of the current element are buffered until its scope closes
    Buffering,
}

/// Buffers property events per element and rewrites proxy resources back to
/// their originals when the element's property list is complete.
#[derive(Debug, Default)]
pub struct PropertyRewriter {
    root: String,
    state: RewriteState,
    buffer: Vec<Property>,
}

impl PropertyRewriter {
    /// Create a rewriter making originals relative to `root` (may be empty).
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            state: RewriteState::Idle,
            buffer: Vec::new(),
        }
    }

    pub fn state(&self) -> RewriteState {
        self.state
    }

    /// Consume one input event, emitting whatever is now final.
    pub fn feed<S: EventSink + ?Sized>(&mut self, event: DocEvent, sink: &mut S) -> DocumentResult<()> {
        match event {
            DocEvent::Property(property) => {
                self.buffer.push(property);
                self.state = RewriteState::Buffering;
                Ok(())
            }
            event if event.ends_property_scope() => {
                self.flush(sink)?;
                sink.emit(event)
            }
            event => sink.emit(event),
        }
    }

    /// Flush anything still buffered when the stream ends without an
    /// explicit end-of-document event.
    pub fn finish<S: EventSink + ?Sized>(&mut self, sink: &mut S) -> DocumentResult<()> {
        self.flush(sink)
    }

    fn flush<S: EventSink + ?Sized>(&mut self, sink: &mut S) -> DocumentResult<()> {
        if self.state == RewriteState::Idle {
            return Ok(());
        }
        let properties = mem::take(&mut self.buffer);
        self.state = RewriteState::Idle;

        for property in rewrite_properties(properties, &self.root) {
            sink.emit(DocEvent::Property(property))?;
        }
        Ok(())
    }
}

/// Rewrite one element's properties.
///
/// Without the proxy marker the list is returned unchanged. With it, the
/// marker and the stashed original are dropped, `resource` is pointed back at
/// the original (as `speed:path` for time-remapped producers) and
/// `warp_resource` at the same path.
pub fn rewrite_properties(properties: Vec<Property>, root: &str) -> Vec<Property> {
    let mut is_proxy = false;
    let mut original: Option<&str> = None;
    let mut resource: Option<&str> = None;
    let mut service = "";
    let mut speed = DEFAULT_WARP_SPEED;

    for p in &properties {
        match p.name.as_str() {
            keys::IS_PROXY => is_proxy = true,
            keys::ORIGINAL_RESOURCE => original = Some(p.value.as_str()),
            keys::RESOURCE => resource = Some(p.value.as_str()),
            keys::MLT_SERVICE => service = p.value.as_str(),
            keys::WARP_SPEED => speed = p.value.as_str(),
            _ => {}
        }
    }

    if !is_proxy {
        return properties;
    }

    let path = relativize(original.or(resource).unwrap_or_default(), root);
    let resource_value = if service == keys::TIMEWARP_SERVICE {
        format!("{speed}:{path}")
    } else {
        path.clone()
    };
    debug!(resource = %resource_value, "Restoring original resource");

    properties
        .iter()
        .filter_map(|p| match p.name.as_str() {
            keys::IS_PROXY | keys::ORIGINAL_RESOURCE => None,
            keys::RESOURCE => Some(Property::new(keys::RESOURCE, resource_value.clone())),
            keys::WARP_RESOURCE => Some(Property::new(keys::WARP_RESOURCE, path.clone())),
            _ => Some(p.clone()),
        })
        .collect()
}

/// Make `path` relative to `root` when it lies beneath it.
///
/// The root only matches at a path component boundary, so `/media` does not
/// strip `/media2/clip.mov`.
pub fn relativize(path: &str, root: &str) -> String {
    if root.is_empty() {
        return path.to_string();
    }
    match path.strip_prefix(root) {
        Some(rest) if root.ends_with('/') => rest.to_string(),
        Some(rest) => match rest.strip_prefix('/') {
            Some(rest) => rest.to_string(),
            None => path.to_string(),
        },
        None => path.to_string(),
    }
}
