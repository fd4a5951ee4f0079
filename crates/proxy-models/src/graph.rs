//! Media graph nodes and depth-first traversal.
//!
//! The graph is a closed set of node kinds. Traversal is a plain `match`
//! driving a [`GraphVisitor`] whose callbacks all default to no-ops.

use crate::clip::Clip;
use crate::properties::Properties;

/// A filter or transition attached to a node.
#[derive(Debug, Clone, Default)]
pub struct Service {
    pub properties: Properties,
}

impl Service {
    pub fn new(service: &str) -> Self {
        let mut properties = Properties::new();
        properties.set(crate::keys::MLT_SERVICE, service);
        Self { properties }
    }
}

/// Leaf media reference.
#[derive(Debug, Clone, Default)]
pub struct Producer {
    pub clip: Clip,
    pub filters: Vec<Service>,
}

impl Producer {
    pub fn new(clip: Clip) -> Self {
        Self {
            clip,
            filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PlaylistEntry {
    /// Gap of the given length in frames
    Blank(u64),
    Clip(MediaNode),
}

#[derive(Debug, Clone, Default)]
pub struct Playlist {
    pub entries: Vec<PlaylistEntry>,
    pub filters: Vec<Service>,
}

#[derive(Debug, Clone)]
pub struct Track {
    pub node: MediaNode,
}

/// Parallel tracks with their mixing transitions (a tractor).
#[derive(Debug, Clone, Default)]
pub struct Multitrack {
    pub tracks: Vec<Track>,
    pub filters: Vec<Service>,
    pub transitions: Vec<Service>,
}

#[derive(Debug, Clone)]
pub enum MediaNode {
    Producer(Producer),
    Playlist(Playlist),
    Multitrack(Multitrack),
}

impl From<Clip> for MediaNode {
    fn from(clip: Clip) -> Self {
        MediaNode::Producer(Producer::new(clip))
    }
}

impl From<Playlist> for MediaNode {
    fn from(playlist: Playlist) -> Self {
        MediaNode::Playlist(playlist)
    }
}

impl From<Multitrack> for MediaNode {
    fn from(multitrack: Multitrack) -> Self {
        MediaNode::Multitrack(multitrack)
    }
}

/// Callbacks invoked by [`walk`].
#[allow(unused_variables)]
pub trait GraphVisitor {
    fn on_start_producer(&mut self, producer: &Producer) {}
    fn on_end_producer(&mut self, producer: &Producer) {}
    fn on_start_playlist(&mut self, playlist: &Playlist) {}
    fn on_end_playlist(&mut self, playlist: &Playlist) {}
    fn on_start_multitrack(&mut self, multitrack: &Multitrack) {}
    fn on_end_multitrack(&mut self, multitrack: &Multitrack) {}
    fn on_start_track(&mut self, track: &Track) {}
    fn on_end_track(&mut self, track: &Track) {}
    fn on_start_filter(&mut self, filter: &Service) {}
    fn on_end_filter(&mut self, filter: &Service) {}
    fn on_start_transition(&mut self, transition: &Service) {}
    fn on_end_transition(&mut self, transition: &Service) {}
}

/// Visit `node` and everything beneath it, depth first, in document order.
pub fn walk<V: GraphVisitor + ?Sized>(node: &MediaNode, visitor: &mut V) {
    match node {
        MediaNode::Producer(producer) => {
            visitor.on_start_producer(producer);
            walk_filters(&producer.filters, visitor);
            visitor.on_end_producer(producer);
        }
        MediaNode::Playlist(playlist) => {
            visitor.on_start_playlist(playlist);
            for entry in &playlist.entries {
                if let PlaylistEntry::Clip(child) = entry {
                    walk(child, visitor);
                }
            }
            walk_filters(&playlist.filters, visitor);
            visitor.on_end_playlist(playlist);
        }
        MediaNode::Multitrack(multitrack) => {
            visitor.on_start_multitrack(multitrack);
            for track in &multitrack.tracks {
                visitor.on_start_track(track);
                walk(&track.node, visitor);
                visitor.on_end_track(track);
            }
            walk_filters(&multitrack.filters, visitor);
            for transition in &multitrack.transitions {
                visitor.on_start_transition(transition);
                visitor.on_end_transition(transition);
            }
            visitor.on_end_multitrack(multitrack);
        }
    }
}

fn walk_filters<V: GraphVisitor + ?Sized>(filters: &[Service], visitor: &mut V) {
    for filter in filters {
        visitor.on_start_filter(filter);
        visitor.on_end_filter(filter);
    }
}
