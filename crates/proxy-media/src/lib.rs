//! External tool wrappers for proxy generation.
//!
//! This crate provides:
//! - Type-safe FFmpeg and melt command building
//! - A runner with progress parsing and a timeout
//! - FFprobe metadata extraction into clip properties
//! - Marker and promotion file helpers

pub mod command;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod progress;

pub use command::{FfmpegCommand, MeltCommand, Tool, ToolRunner};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{move_file, touch_marker};
pub use probe::{probe_media, MediaMetadata};
pub use progress::{StderrProgressParser, ToolProgress};
