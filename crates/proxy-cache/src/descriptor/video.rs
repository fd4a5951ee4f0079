//! Video proxy transcode parameters.

use std::path::Path;

use proxy_media::FfmpegCommand;
use proxy_models::encoding::{
    PROXY_AUDIO_BITRATE, PROXY_AUDIO_CODEC, PROXY_CONTAINER, PROXY_PIXEL_FORMAT, SOFTWARE_CRF,
    SOFTWARE_PRESET, SOFTWARE_VIDEO_CODEC,
};
use proxy_models::{keys, AspectRatio, Clip, ProxySettings, ScanMode};

/// Device setup shared by the VA-API encoders.
const VAAPI_DEVICE_ARGS: &[&str] = &[
    "-init_hw_device",
    "vaapi=vaapi0:,connection_type=x11",
    "-filter_hw_device",
    "vaapi0",
];

/// Hardware encoder with its fixed rate control.
struct HardwareEncoder {
    codec: &'static str,
    /// Arguments placed before `-codec:v`
    setup: &'static [&'static str],
    /// Arguments placed after `-codec:v`
    quality: &'static [&'static str],
}

/// Priority order; the first available encoder wins.
const HARDWARE_ENCODERS: &[HardwareEncoder] = &[
    HardwareEncoder {
        codec: "hevc_nvenc",
        setup: &[],
        quality: &["-rc", "constqp", "-vglobal_quality", "37"],
    },
    HardwareEncoder {
        codec: "hevc_qsv",
        setup: &["-load_plugin", "hevc_hw"],
        quality: &["-global_quality:v", "36", "-look_ahead", "1"],
    },
    HardwareEncoder {
        codec: "hevc_amf",
        setup: &[],
        quality: &["-rc", "1", "-qp_i", "32", "-qp_p", "32"],
    },
    HardwareEncoder {
        codec: "hevc_vaapi",
        setup: VAAPI_DEVICE_ARGS,
        quality: &["-qp", "37"],
    },
    HardwareEncoder {
        codec: "h264_vaapi",
        setup: VAAPI_DEVICE_ARGS,
        quality: &["-qp", "30"],
    },
    HardwareEncoder {
        codec: "hevc_videotoolbox",
        setup: &[],
        quality: &["-b:v", "2M"],
    },
];

/// Per-request choices that are not read from the clip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoProxyOptions {
    pub full_range: bool,
    pub scan_mode: ScanMode,
    pub aspect_ratio: Option<AspectRatio>,
}

impl VideoProxyOptions {
    /// Options used for automatic generation: detected range, automatic
    /// deinterlace, no aspect override.
    pub fn for_clip(clip: &Clip) -> Self {
        Self {
            full_range: is_full_range(clip),
            ..Default::default()
        }
    }
}

/// True when the clip's selected video stream is full (jpeg) range.
pub fn is_full_range(clip: &Clip) -> bool {
    if clip.get(keys::META_COLOR_RANGE).as_deref() == Some("full") {
        return true;
    }
    let index = clip.get_int(keys::VIDEO_INDEX);
    clip.get(&keys::stream_key(index, "codec.pix_fmt"))
        .is_some_and(|pix_fmt| pix_fmt.starts_with("yuvj"))
}

/// Build the ffmpeg command rendering `resource` into `pending`.
pub fn video_proxy_command(
    clip: &Clip,
    resource: &str,
    options: &VideoProxyOptions,
    settings: &ProxySettings,
    pending: &Path,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(resource, pending)
        .log_level("verbose")
        .option("-max_muxing_queue_size", "9999");

    // Keep the source's audio/video order; data, subtitle and attachment streams are dropped
    cmd = if clip.get_int(keys::VIDEO_INDEX) < clip.get_int(keys::AUDIO_INDEX) {
        cmd.map("0:v?").map("0:a?")
    } else {
        cmd.map("0:a?").map("0:v?")
    };
    cmd = cmd.option("-map_metadata", "0").output_arg("-ignore_unknown");

    let hw_upload = settings.has_hardware_codec("hevc_vaapi") || settings.has_hardware_codec("h264_vaapi");
    cmd = cmd
        .video_filter(video_filters(options, settings.resolution(), hw_upload))
        .option("-color_range", if options.full_range { "jpeg" } else { "mpeg" });

    let (primaries, trc, colorspace) = color_triplet(
        clip.get_int(keys::META_COLORSPACE),
        clip.get_int(keys::META_HEIGHT),
    );
    cmd = cmd
        .option("-color_primaries", primaries)
        .option("-color_trc", trc)
        .option("-colorspace", colorspace);

    if let Some(aspect) = options.aspect_ratio {
        cmd = cmd.option("-aspect", aspect.to_string());
    }

    cmd = cmd
        .format(PROXY_CONTAINER)
        .audio_codec(PROXY_AUDIO_CODEC)
        .audio_bitrate(PROXY_AUDIO_BITRATE)
        .pixel_format(PROXY_PIXEL_FORMAT);

    cmd = match hardware_encoder(settings) {
        Some(encoder) => cmd
            .output_args(encoder.setup.iter().copied())
            .video_codec(encoder.codec)
            .output_args(encoder.quality.iter().copied()),
        None => cmd
            .video_codec(SOFTWARE_VIDEO_CODEC)
            .preset(SOFTWARE_PRESET)
            .crf(SOFTWARE_CRF),
    };

    // Intra-only for cheap seeking
    cmd.option("-g", "1").option("-bf", "0")
}

fn hardware_encoder(settings: &ProxySettings) -> Option<&'static HardwareEncoder> {
    HARDWARE_ENCODERS
        .iter()
        .find(|encoder| settings.has_hardware_codec(encoder.codec))
}

/// Deinterlace, scale and range conversion as one `-vf` expression.
fn video_filters(options: &VideoProxyOptions, resolution: u32, hw_upload: bool) -> String {
    let mut filters = match options.scan_mode {
        ScanMode::Automatic => "yadif=deint=interlaced,".to_string(),
        ScanMode::Progressive => String::new(),
        ScanMode::InterlacedTopFieldFirst => "yadif=parity=tff,".to_string(),
        ScanMode::InterlacedBottomFieldFirst => "yadif=parity=bff,".to_string(),
    };
    filters.push_str(&format!("scale=width=-2:height={resolution}"));
    filters.push_str(if options.full_range {
        ":in_range=full:out_range=full"
    } else {
        ":in_range=mpeg:out_range=mpeg"
    });
    if hw_upload {
        filters.push_str(",format=nv12,hwupload");
    }
    filters
}

/// Primaries, transfer and matrix for a colorspace code.
fn color_triplet(colorspace: i64, height: i64) -> (&'static str, &'static str, &'static str) {
    match colorspace {
        // 625-line SD
        601 if height == 576 => ("bt470bg", "smpte170m", "bt470bg"),
        601 | 170 => ("smpte170m", "smpte170m", "smpte170m"),
        240 => ("smpte240m", "smpte240m", "smpte240m"),
        470 => ("bt470bg", "bt470bg", "bt470bg"),
        _ => ("bt709", "bt709", "bt709"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip() -> Clip {
        let clip = Clip::with_resource("avformat", "/media/a.mov");
        clip.update(|p| {
            p.set_int(keys::VIDEO_INDEX, 0);
            p.set_int(keys::AUDIO_INDEX, 1);
            p.set_int(keys::META_WIDTH, 1920);
            p.set_int(keys::META_HEIGHT, 1080);
            p.set_int(keys::META_COLORSPACE, 709);
        });
        clip
    }

    fn build(clip: &Clip, options: &VideoProxyOptions, settings: &ProxySettings) -> Vec<String> {
        video_proxy_command(clip, "/media/a.mov", options, settings, Path::new("/cache/H.pending.mp4")).build_args()
    }

    fn value_of<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_software_defaults() {
        let args = build(&clip(), &VideoProxyOptions::default(), &ProxySettings::default());

        let expected: Vec<String> = [
            "-loglevel", "verbose",
            "-i", "/media/a.mov",
            "-max_muxing_queue_size", "9999",
            "-map", "0:v?", "-map", "0:a?",
            "-map_metadata", "0", "-ignore_unknown",
            "-vf", "yadif=deint=interlaced,scale=width=-2:height=540:in_range=mpeg:out_range=mpeg",
            "-color_range", "mpeg",
            "-color_primaries", "bt709", "-color_trc", "bt709", "-colorspace", "bt709",
            "-f", "mp4", "-codec:a", "ac3", "-b:a", "256k",
            "-pix_fmt", "yuv420p",
            "-codec:v", "libx264", "-preset", "veryfast", "-crf", "23",
            "-g", "1", "-bf", "0",
            "-y", "/cache/H.pending.mp4",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn test_audio_first_when_audio_index_lower() {
        let clip = clip();
        clip.set_int(keys::VIDEO_INDEX, 1);
        clip.set_int(keys::AUDIO_INDEX, 0);

        let args = build(&clip, &VideoProxyOptions::default(), &ProxySettings::default());
        let maps: Vec<_> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-map")
            .map(|(i, _)| args[i + 1].as_str())
            .collect();
        assert_eq!(maps, ["0:a?", "0:v?"]);
    }

    #[test]
    fn test_scan_modes() {
        let settings = ProxySettings::default();
        let vf = |scan_mode| {
            let options = VideoProxyOptions {
                scan_mode,
                ..Default::default()
            };
            value_of(&build(&clip(), &options, &settings), "-vf")
                .unwrap()
                .to_string()
        };

        let progressive = vf(ScanMode::Progressive);
        assert!(!progressive.contains("yadif"));
        assert!(progressive.starts_with("scale="));
        assert!(!vf(ScanMode::Automatic).contains("parity"));
        assert!(vf(ScanMode::InterlacedTopFieldFirst).starts_with("yadif=parity=tff,"));
        assert!(vf(ScanMode::InterlacedBottomFieldFirst).starts_with("yadif=parity=bff,"));
    }

    #[test]
    fn test_preview_scale_sets_height() {
        let settings = ProxySettings::default().with_preview_scale(720);
        let args = build(&clip(), &VideoProxyOptions::default(), &settings);
        assert!(value_of(&args, "-vf").unwrap().contains("scale=width=-2:height=720:"));
    }

    #[test]
    fn test_full_range() {
        let options = VideoProxyOptions {
            full_range: true,
            ..Default::default()
        };
        let args = build(&clip(), &options, &ProxySettings::default());
        assert!(value_of(&args, "-vf").unwrap().ends_with(":in_range=full:out_range=full"));
        assert_eq!(value_of(&args, "-color_range"), Some("jpeg"));
    }

    #[test]
    fn test_color_triplets() {
        assert_eq!(color_triplet(601, 576), ("bt470bg", "smpte170m", "bt470bg"));
        assert_eq!(color_triplet(601, 480), ("smpte170m", "smpte170m", "smpte170m"));
        assert_eq!(color_triplet(170, 576), ("smpte170m", "smpte170m", "smpte170m"));
        assert_eq!(color_triplet(240, 1035), ("smpte240m", "smpte240m", "smpte240m"));
        assert_eq!(color_triplet(470, 576), ("bt470bg", "bt470bg", "bt470bg"));
        assert_eq!(color_triplet(0, 1080), ("bt709", "bt709", "bt709"));
        assert_eq!(color_triplet(2020, 2160), ("bt709", "bt709", "bt709"));
    }

    #[test]
    fn test_aspect_override() {
        let options = VideoProxyOptions {
            aspect_ratio: Some(AspectRatio::new(16, 9)),
            ..Default::default()
        };
        let args = build(&clip(), &options, &ProxySettings::default());
        assert_eq!(value_of(&args, "-aspect"), Some("16:9"));
    }

    #[test]
    fn test_hardware_cascade_order() {
        let settings = ProxySettings::default().with_hardware(["h264_vaapi", "hevc_qsv"]);
        let args = build(&clip(), &VideoProxyOptions::default(), &settings);

        assert_eq!(value_of(&args, "-codec:v"), Some("hevc_qsv"));
        assert_eq!(value_of(&args, "-load_plugin"), Some("hevc_hw"));
        assert!(!args.iter().any(|a| a == "-crf"));
        // VA-API is available, so frames are uploaded even though QSV encodes
        assert!(value_of(&args, "-vf").unwrap().ends_with(",format=nv12,hwupload"));
    }

    #[test]
    fn test_vaapi_device_setup() {
        let settings = ProxySettings::default().with_hardware(["hevc_vaapi"]);
        let args = build(&clip(), &VideoProxyOptions::default(), &settings);

        let codec = args.iter().position(|a| a == "-codec:v").unwrap();
        let device = args.iter().position(|a| a == "-init_hw_device").unwrap();
        assert!(device < codec);
        assert_eq!(value_of(&args, "-filter_hw_device"), Some("vaapi0"));
        assert_eq!(value_of(&args, "-qp"), Some("37"));
    }

    #[test]
    fn test_hardware_list_ignored_when_disabled() {
        let mut settings = ProxySettings::default().with_hardware(["hevc_nvenc"]);
        settings.use_hardware = false;
        let args = build(&clip(), &VideoProxyOptions::default(), &settings);
        assert_eq!(value_of(&args, "-codec:v"), Some("libx264"));
    }

    #[test]
    fn test_is_full_range_from_pix_fmt() {
        let clip = clip();
        assert!(!is_full_range(&clip));

        clip.set("meta.media.0.codec.pix_fmt", "yuvj420p");
        assert!(is_full_range(&clip));

        let signaled = Clip::with_resource("avformat", "/media/b.mov");
        signaled.set(keys::META_COLOR_RANGE, "full");
        assert!(is_full_range(&signaled));
    }
}
