//! Read-only proxy settings snapshot.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::encoding::{FALLBACK_PROXY_RESOLUTION, PROXY_RESOLUTION_RATIO};

/// Proxy configuration owned by the host application.
///
/// Every cache operation receives this snapshot instead of reading global
/// state, so tests can build one directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Proxy feature switch
    pub enabled: bool,
    /// Global proxy folder
    pub proxy_folder: PathBuf,
    /// Prefer `<project>/proxies` when a project folder is known
    pub use_project_folder: bool,
    /// Allow hardware encoders from `hardware_codecs`
    pub use_hardware: bool,
    /// Hardware encoders detected on this machine
    pub hardware_codecs: Vec<String>,
    /// Preview scale (proxy height); `None` or 0 uses the fallback
    pub preview_scale: Option<u32>,
    /// Folder of the currently open project
    pub project_folder: Option<PathBuf>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            proxy_folder: default_proxy_folder(),
            use_project_folder: true,
            use_hardware: false,
            hardware_codecs: Vec::new(),
            preview_scale: None,
            project_folder: None,
        }
    }
}

fn default_proxy_folder() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("proxycache")
        .join("proxies")
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

impl ProxySettings {
    /// Create settings from environment variables.
    pub fn from_env() -> Self {
        Self {
            enabled: env_flag("PROXY_ENABLED", true),
            proxy_folder: std::env::var("PROXY_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_proxy_folder()),
            use_project_folder: env_flag("PROXY_USE_PROJECT_FOLDER", true),
            use_hardware: env_flag("PROXY_USE_HARDWARE", false),
            hardware_codecs: std::env::var("PROXY_HARDWARE_CODECS")
                .map(|s| {
                    s.split(',')
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            preview_scale: std::env::var("PROXY_PREVIEW_SCALE")
                .ok()
                .and_then(|s| s.parse().ok()),
            project_folder: std::env::var("PROXY_PROJECT_FOLDER").ok().map(PathBuf::from),
        }
    }

    /// Target proxy height in lines.
    pub fn resolution(&self) -> u32 {
        match self.preview_scale {
            Some(scale) if scale > 0 => scale,
            _ => FALLBACK_PROXY_RESOLUTION,
        }
    }

    /// Minimum source width and height (exclusive) worth proxying.
    pub fn size_threshold(&self) -> i64 {
        (PROXY_RESOLUTION_RATIO * f64::from(self.resolution())).round() as i64
    }

    /// True when hardware encoding is on and `codec` is available.
    pub fn has_hardware_codec(&self, codec: &str) -> bool {
        self.use_hardware && self.hardware_codecs.iter().any(|c| c == codec)
    }

    pub fn with_preview_scale(mut self, scale: u32) -> Self {
        self.preview_scale = Some(scale);
        self
    }

    pub fn with_proxy_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.proxy_folder = folder.into();
        self
    }

    pub fn with_project_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.project_folder = Some(folder.into());
        self
    }

    /// Enable hardware encoding with the given encoder list.
    pub fn with_hardware<I, S>(mut self, codecs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.use_hardware = true;
        self.hardware_codecs = codecs.into_iter().map(Into::into).collect();
        self
    }
}
