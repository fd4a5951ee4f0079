//! Well-known clip property names.
//!
//! Keys prefixed with `shotcut:` are written into saved project documents and
//! must keep their exact spelling to stay readable by existing projects.

/// Marker set to `1` on a clip whose `resource` points at a proxy file.
pub const IS_PROXY: &str = "shotcut:proxy";
/// Stash of the original resource path while a clip is proxied.
pub const ORIGINAL_RESOURCE: &str = "shotcut:resource";
/// Set to `1` when the user opted this clip out of proxying.
pub const DISABLE_PROXY: &str = "shotcut:disableProxy";
/// Set to `1` on image producers that represent a numbered image sequence.
pub const SEQUENCE: &str = "shotcut:sequence";
/// Content hash cached on the clip by the hashing collaborator.
pub const HASH: &str = "shotcut:hash";

pub const RESOURCE: &str = "resource";
pub const MLT_SERVICE: &str = "mlt_service";
pub const WARP_RESOURCE: &str = "warp_resource";
pub const WARP_SPEED: &str = "warp_speed";

pub const VIDEO_INDEX: &str = "video_index";
pub const AUDIO_INDEX: &str = "audio_index";

pub const META_WIDTH: &str = "meta.media.width";
pub const META_HEIGHT: &str = "meta.media.height";
pub const META_COLORSPACE: &str = "meta.media.colorspace";
pub const META_COLOR_RANGE: &str = "meta.media.color_range";
pub const META_NB_STREAMS: &str = "meta.media.nb_streams";

/// Per-stream metadata key, e.g. `meta.media.0.codec.pix_fmt`.
pub fn stream_key(index: i64, field: &str) -> String {
    format!("meta.media.{index}.{field}")
}

/// Service name of the time-remap producer.
pub const TIMEWARP_SERVICE: &str = "timewarp";
/// Service prefix of demuxing (libavformat) producers.
pub const AVFORMAT_SERVICE_PREFIX: &str = "avformat";
/// Still image services eligible for image proxies.
pub const IMAGE_SERVICES: [&str; 2] = ["qimage", "pixbuf"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_key() {
        assert_eq!(stream_key(1, "codec.pix_fmt"), "meta.media.1.codec.pix_fmt");
    }
}
