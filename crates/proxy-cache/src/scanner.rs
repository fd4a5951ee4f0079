//! Media graph scan for clips still pointing at their originals.

use proxy_models::{walk, Clip, GraphVisitor, MediaNode, Producer};

/// Collects every distinct producer clip not already using a proxy.
#[derive(Debug, Default)]
pub struct NonProxyCollector {
    clips: Vec<Clip>,
}

impl NonProxyCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_clips(self) -> Vec<Clip> {
        self.clips
    }
}

impl GraphVisitor for NonProxyCollector {
    fn on_start_producer(&mut self, producer: &Producer) {
        let clip = &producer.clip;
        // The same clip may be cut into a playlist several times
        if !clip.is_proxy() && !self.clips.iter().any(|c| c.ptr_eq(clip)) {
            self.clips.push(clip.clone());
        }
    }
}

/// Non-proxy clips of `graph` in traversal order.
pub fn find_non_proxy_clips(graph: &MediaNode) -> Vec<Clip> {
    let mut collector = NonProxyCollector::new();
    walk(graph, &mut collector);
    collector.into_clips()
}
