//! Shared data models for the proxy media cache.
//!
//! This crate provides Serde-serializable types for:
//! - Clip identities and the live clip handle
//! - Media graph nodes and their traversal
//! - Proxy cache states and records
//! - The injected proxy settings snapshot
//! - Well-known property keys and encoding constants

pub mod clip;
pub mod encoding;
pub mod graph;
pub mod identity;
pub mod job;
pub mod keys;
pub mod media;
pub mod properties;
pub mod settings;

// Re-export common types
pub use clip::Clip;
pub use graph::{walk, GraphVisitor, MediaNode, Multitrack, Playlist, PlaylistEntry, Producer, Service, Track};
pub use identity::{ClipIdentity, IdentityProvider, StoredHashIdentity};
pub use job::JobId;
pub use media::{AspectRatio, MediaKind, ModelError, ProxyRecord, ProxyState, ScanMode};
pub use properties::Properties;
pub use settings::ProxySettings;
