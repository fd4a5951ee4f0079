//! FFprobe media information mapped onto clip metadata.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use proxy_models::{keys, Clip, ScanMode};

use crate::error::{MediaError, MediaResult};

/// Media information relevant to proxy generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Width in pixels of the first video stream
    pub width: u32,
    /// Height in pixels of the first video stream
    pub height: u32,
    /// Colorspace code (601, 709, 240, 470, 2020)
    pub colorspace: i64,
    /// `full` or `limited` when signaled
    pub color_range: Option<String>,
    /// Pixel format of the first video stream
    pub pix_fmt: Option<String>,
    /// Field order as reported by ffprobe
    pub field_order: Option<String>,
    /// Stream index of the first video stream
    pub video_index: Option<i64>,
    /// Stream index of the first audio stream
    pub audio_index: Option<i64>,
    /// Total stream count
    pub nb_streams: usize,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: i64,
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    pix_fmt: Option<String>,
    color_range: Option<String>,
    color_space: Option<String>,
    field_order: Option<String>,
}

/// Probe a media file.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaMetadata> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::ToolNotFound("ffprobe"))?;

    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ProbeFailed {
            path: path.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_probe_output(&output.stdout)
}

/// Parse `ffprobe -show_streams -print_format json` output.
pub fn parse_probe_output(json: &[u8]) -> MediaResult<MediaMetadata> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let video = probe.streams.iter().find(|s| s.codec_type == "video");
    let audio = probe.streams.iter().find(|s| s.codec_type == "audio");

    if video.is_none() && audio.is_none() {
        return Err(MediaError::NoMediaStreams);
    }

    let width = video.and_then(|s| s.width).unwrap_or(0);
    let height = video.and_then(|s| s.height).unwrap_or(0);

    Ok(MediaMetadata {
        width,
        height,
        colorspace: colorspace_code(video.and_then(|s| s.color_space.as_deref()), height),
        color_range: video.and_then(|s| s.color_range.clone()),
        pix_fmt: video.and_then(|s| s.pix_fmt.clone()),
        field_order: video.and_then(|s| s.field_order.clone()),
        video_index: video.map(|s| s.index),
        audio_index: audio.map(|s| s.index),
        nb_streams: probe.streams.len(),
    })
}

/// Map an ffprobe colorspace name to the framework's numeric code.
///
/// Unsignaled colorspace is guessed from the frame height.
fn colorspace_code(name: Option<&str>, height: u32) -> i64 {
    match name {
        Some("bt709") => 709,
        Some("smpte170m") => 170,
        Some("bt470bg") => 470,
        Some("smpte240m") => 240,
        Some("bt2020nc") | Some("bt2020c") => 2020,
        _ if height < 720 => 601,
        _ => 709,
    }
}

impl MediaMetadata {
    /// True when the video stream uses full (jpeg) range.
    pub fn is_full_range(&self) -> bool {
        self.color_range.as_deref() == Some("pc")
            || self.color_range.as_deref() == Some("full")
            || self.pix_fmt.as_deref().is_some_and(|p| p.starts_with("yuvj"))
    }

    /// Deinterlace mode implied by the signaled field order.
    pub fn scan_mode(&self) -> ScanMode {
        match self.field_order.as_deref() {
            Some("progressive") => ScanMode::Progressive,
            Some("tt") | Some("tb") => ScanMode::InterlacedTopFieldFirst,
            Some("bb") | Some("bt") => ScanMode::InterlacedBottomFieldFirst,
            _ => ScanMode::Automatic,
        }
    }

    /// Write the metadata onto a clip using the framework's property names.
    pub fn apply_to(&self, clip: &Clip) {
        clip.update(|p| {
            p.set_int(keys::META_WIDTH, i64::from(self.width));
            p.set_int(keys::META_HEIGHT, i64::from(self.height));
            p.set_int(keys::META_COLORSPACE, self.colorspace);
            p.set_int(keys::META_NB_STREAMS, self.nb_streams as i64);
            if self.is_full_range() {
                p.set(keys::META_COLOR_RANGE, "full");
            }
            // Absent streams read as -1 so ordering comparisons stay meaningful
            p.set_int(keys::VIDEO_INDEX, self.video_index.unwrap_or(-1));
            p.set_int(keys::AUDIO_INDEX, self.audio_index.unwrap_or(-1));
            if let (Some(index), Some(pix_fmt)) = (self.video_index, &self.pix_fmt) {
                p.set(keys::stream_key(index, "stream.type"), "video");
                p.set(keys::stream_key(index, "codec.pix_fmt"), pix_fmt.as_str());
            }
        });
    }
}
