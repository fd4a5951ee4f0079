//! Still image proxy render parameters.

use std::path::Path;

use proxy_media::MeltCommand;
use proxy_models::encoding::{IMAGE_PIXEL_FORMAT, IMAGE_PROFILE};
use proxy_models::{keys, Clip};

/// Build the melt command rendering the still `resource` into `pending`.
///
/// The proxy is `resolution` lines high with the source's aspect ratio.
/// Without usable source dimensions it is rendered square.
pub fn image_proxy_command(clip: &Clip, resource: &str, resolution: u32, pending: &Path) -> MeltCommand {
    let width = clip.get_double(keys::META_WIDTH);
    let height = clip.get_double(keys::META_HEIGHT);
    let proxy_width = if width > 0.0 && height > 0.0 {
        (width / height * f64::from(resolution)).round() as i64
    } else {
        i64::from(resolution)
    };

    MeltCommand::new(resource, pending)
        .verbose()
        .profile(IMAGE_PROFILE)
        .producer_property("out", 0)
        .consumer_property("width", proxy_width)
        .consumer_property("height", resolution)
        .consumer_property("pix_fmt", IMAGE_PIXEL_FORMAT)
        .consumer_property("color_range", "full")
}
