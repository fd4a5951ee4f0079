//! Derivation descriptors: the exact tool commands that render a proxy.

mod image;
mod video;

pub use image::image_proxy_command;
pub use video::{is_full_range, video_proxy_command, VideoProxyOptions};
