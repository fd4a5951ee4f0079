//! Proxy encoding constants.

/// Finished video proxy suffix
pub const PROXY_VIDEO_EXTENSION: &str = ".mp4";
/// In-progress video proxy suffix
pub const PROXY_PENDING_VIDEO_EXTENSION: &str = ".pending.mp4";
/// Finished image proxy suffix
pub const PROXY_IMAGE_EXTENSION: &str = ".jpg";
/// In-progress image proxy suffix
pub const PROXY_PENDING_IMAGE_EXTENSION: &str = ".pending.jpg";

/// Name of the proxy subfolder inside a project folder.
pub const PROJECT_PROXY_SUBFOLDER: &str = "proxies";

/// Proxy height when no preview scale is configured.
pub const FALLBACK_PROXY_RESOLUTION: u32 = 540;
/// Sources must exceed `resolution * ratio` in both dimensions to be proxied.
pub const PROXY_RESOLUTION_RATIO: f64 = 1.3;

/// Proxy container and audio.
pub const PROXY_CONTAINER: &str = "mp4";
pub const PROXY_AUDIO_CODEC: &str = "ac3";
pub const PROXY_AUDIO_BITRATE: &str = "256k";
pub const PROXY_PIXEL_FORMAT: &str = "yuv420p";

/// Software fallback encoder.
pub const SOFTWARE_VIDEO_CODEC: &str = "libx264";
pub const SOFTWARE_PRESET: &str = "veryfast";
pub const SOFTWARE_CRF: u8 = 23;

/// Still image proxy rendering.
pub const IMAGE_PROFILE: &str = "square_pal";
pub const IMAGE_PIXEL_FORMAT: &str = "yuvj422p";
