//! Media kinds, scan modes and proxy cache states.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::encoding::{
    PROXY_IMAGE_EXTENSION, PROXY_PENDING_IMAGE_EXTENSION, PROXY_PENDING_VIDEO_EXTENSION,
    PROXY_VIDEO_EXTENSION,
};

/// Errors parsing model values from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Invalid aspect ratio: {0}")]
    InvalidAspectRatio(String),

    #[error("Invalid scan mode: {0}")]
    InvalidScanMode(String),

    #[error("Invalid media kind: {0}")]
    InvalidMediaKind(String),
}

/// Kind of proxy to produce for a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Demuxed audio/video, transcoded with ffmpeg
    Video,
    /// Still image, rendered with melt
    Image,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Video, MediaKind::Image];

    /// Suffix of a finished proxy file.
    pub fn ready_suffix(&self) -> &'static str {
        match self {
            MediaKind::Video => PROXY_VIDEO_EXTENSION,
            MediaKind::Image => PROXY_IMAGE_EXTENSION,
        }
    }

    /// Suffix of the in-progress marker file.
    pub fn pending_suffix(&self) -> &'static str {
        match self {
            MediaKind::Video => PROXY_PENDING_VIDEO_EXTENSION,
            MediaKind::Image => PROXY_PENDING_IMAGE_EXTENSION,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
        }
    }

    /// Kind of a pending marker, judged by its file name.
    pub fn of_pending_path(path: &Path) -> Option<MediaKind> {
        let name = path.file_name()?.to_str()?;
        Self::ALL
            .into_iter()
            .find(|kind| name.ends_with(kind.pending_suffix()))
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(MediaKind::Video),
            "image" => Ok(MediaKind::Image),
            other => Err(ModelError::InvalidMediaKind(other.to_string())),
        }
    }
}

/// Ready path for a pending marker: same directory, pending suffix swapped
/// for the ready suffix.
pub fn ready_path_for(pending: &Path) -> Option<PathBuf> {
    let kind = MediaKind::of_pending_path(pending)?;
    let name = pending.file_name()?.to_str()?;
    let stem = name.strip_suffix(kind.pending_suffix())?;
    Some(pending.with_file_name(format!("{stem}{}", kind.ready_suffix())))
}

/// Field order handling for the deinterlace stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Deinterlace only frames flagged as interlaced
    #[default]
    Automatic,
    /// Never deinterlace
    Progressive,
    /// Force top field first
    InterlacedTopFieldFirst,
    /// Force bottom field first
    InterlacedBottomFieldFirst,
}

impl FromStr for ScanMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "automatic" => Ok(ScanMode::Automatic),
            "progressive" => Ok(ScanMode::Progressive),
            "tff" | "top" => Ok(ScanMode::InterlacedTopFieldFirst),
            "bff" | "bottom" => Ok(ScanMode::InterlacedBottomFieldFirst),
            other => Err(ModelError::InvalidScanMode(other.to_string())),
        }
    }
}

/// Explicit display aspect ratio override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AspectRatio {
    pub num: u32,
    pub den: u32,
}

impl AspectRatio {
    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.num, self.den)
    }
}

impl FromStr for AspectRatio {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidAspectRatio(s.to_string());
        let (num, den) = s.split_once(':').ok_or_else(invalid)?;
        let num = num.trim().parse().map_err(|_| invalid())?;
        let den = den.trim().parse().map_err(|_| invalid())?;
        if num == 0 || den == 0 {
            return Err(invalid());
        }
        Ok(Self { num, den })
    }
}

/// Observed cache state for one identity and media kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyState {
    /// Neither a proxy nor a pending marker exists
    Absent,
    /// A pending marker exists, generation is in progress (or was abandoned)
    Pending,
    /// A finished proxy file exists
    Ready,
}

impl ProxyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyState::Absent => "absent",
            ProxyState::Pending => "pending",
            ProxyState::Ready => "ready",
        }
    }
}

impl fmt::Display for ProxyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived view of the cache for one clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRecord {
    pub state: ProxyState,
    /// Where the finished proxy is (Ready) or will be placed
    pub ready_path: PathBuf,
    /// Where the pending marker is (Pending) or will be created
    pub pending_path: PathBuf,
}

impl ProxyRecord {
    pub fn is_ready(&self) -> bool {
        self.state == ProxyState::Ready
    }

    pub fn is_pending(&self) -> bool {
        self.state == ProxyState::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_path_for_pending() {
        assert_eq!(
            ready_path_for(Path::new("/cache/H.pending.mp4")),
            Some(PathBuf::from("/cache/H.mp4"))
        );
        assert_eq!(
            ready_path_for(Path::new("/cache/H.pending.jpg")),
            Some(PathBuf::from("/cache/H.jpg"))
        );
        assert_eq!(ready_path_for(Path::new("/cache/H.mp4")), None);
    }

    #[test]
    fn test_aspect_ratio_parse() {
        assert_eq!("16:9".parse::<AspectRatio>(), Ok(AspectRatio::new(16, 9)));
        assert!("16x9".parse::<AspectRatio>().is_err());
        assert!("0:9".parse::<AspectRatio>().is_err());
        assert_eq!(AspectRatio::new(4, 3).to_string(), "4:3");
    }

    #[test]
    fn test_scan_mode_parse() {
        assert_eq!("tff".parse::<ScanMode>(), Ok(ScanMode::InterlacedTopFieldFirst));
        assert_eq!("auto".parse::<ScanMode>(), Ok(ScanMode::Automatic));
        assert!("sideways".parse::<ScanMode>().is_err());
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(MediaKind::Video.ready_suffix(), ".mp4");
        assert_eq!(MediaKind::Video.pending_suffix(), ".pending.mp4");
        assert_eq!(MediaKind::Image.ready_suffix(), ".jpg");
        assert_eq!(MediaKind::Image.pending_suffix(), ".pending.jpg");
    }
}
