//! Proxy media cache.
//!
//! This crate provides:
//! - Cache lookup across the project and global proxy folders
//! - The ffmpeg and melt derivation descriptors for video and still images
//! - `ProxyManager`, which ties lookup, marker creation and job submission
//!   together for single clips and whole media graphs

pub mod descriptor;
pub mod error;
pub mod locator;
pub mod manager;
pub mod scanner;

pub use descriptor::{image_proxy_command, is_full_range, video_proxy_command, VideoProxyOptions};
pub use error::{CacheError, CacheResult};
pub use locator::{media_kind, service_kind, ProxyDirs};
pub use manager::{effective_resource, ProxyManager};
pub use scanner::{find_non_proxy_clips, NonProxyCollector};
