//! Proxy file lookup.
//!
//! A proxy lives at `<folder>/<identity><suffix>`, where the folder is either
//! `<project>/proxies` or the global proxy folder. The project folder wins
//! when both hold a file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use proxy_models::encoding::PROJECT_PROXY_SUBFOLDER;
use proxy_models::{keys, Clip, ClipIdentity, MediaKind, ProxyRecord, ProxySettings, ProxyState};
use tracing::{debug, info, warn};

use crate::error::CacheResult;

/// Kind of proxy `clip` is eligible for, if any.
///
/// Clips already pointing at a proxy, or opted out of proxying, never are.
pub fn media_kind(clip: &Clip) -> Option<MediaKind> {
    if clip.is_proxy() || clip.flag(keys::DISABLE_PROXY) {
        return None;
    }
    service_kind(clip)
}

/// Kind of proxy matching the clip's decoding service, ignoring proxy flags.
pub fn service_kind(clip: &Clip) -> Option<MediaKind> {
    let service = clip.service();
    if service.starts_with(keys::AVFORMAT_SERVICE_PREFIX) {
        Some(MediaKind::Video)
    } else if keys::IMAGE_SERVICES.contains(&service.as_str()) && !clip.flag(keys::SEQUENCE) {
        Some(MediaKind::Image)
    } else {
        None
    }
}

/// The two folders that may hold proxies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDirs {
    /// `<project>/proxies`, when a project folder is known
    project: Option<PathBuf>,
    /// Global proxy folder
    global: PathBuf,
    /// New proxies go to the project folder
    prefer_project: bool,
}

impl ProxyDirs {
    pub fn new(project_folder: Option<&Path>, global: impl Into<PathBuf>, prefer_project: bool) -> Self {
        Self {
            project: project_folder.map(|p| p.join(PROJECT_PROXY_SUBFOLDER)),
            global: global.into(),
            prefer_project,
        }
    }

    pub fn from_settings(settings: &ProxySettings) -> Self {
        Self::new(
            settings.project_folder.as_deref(),
            &settings.proxy_folder,
            settings.use_project_folder,
        )
    }

    pub fn project(&self) -> Option<&Path> {
        self.project.as_deref()
    }

    pub fn global(&self) -> &Path {
        &self.global
    }

    /// Lookup order: project folder first.
    fn search_dirs(&self) -> impl Iterator<Item = &Path> {
        self.project.as_deref().into_iter().chain(std::iter::once(self.global.as_path()))
    }

    /// Folder new proxies are written to, without touching the filesystem.
    pub fn output_dir_path(&self) -> PathBuf {
        match &self.project {
            Some(project) if self.prefer_project && project_root_exists(project) => project.clone(),
            _ => self.global.clone(),
        }
    }

    /// Folder new proxies are written to, created if missing.
    pub fn output_dir(&self) -> CacheResult<PathBuf> {
        let dir = self.output_dir_path();
        if !dir.is_dir() {
            fs::create_dir_all(&dir)?;
            debug!(dir = %dir.display(), "Created proxy folder");
        }
        Ok(dir)
    }

    /// Current cache state of `identity` for `kind`.
    pub fn locate(&self, identity: &ClipIdentity, kind: MediaKind) -> ProxyRecord {
        let ready_name = identity.file_name(kind.ready_suffix());
        let pending_name = identity.file_name(kind.pending_suffix());

        if let Some(dir) = self.search_dirs().find(|d| d.join(&ready_name).is_file()) {
            return ProxyRecord {
                state: ProxyState::Ready,
                ready_path: dir.join(&ready_name),
                pending_path: dir.join(&pending_name),
            };
        }

        if let Some(dir) = self.search_dirs().find(|d| d.join(&pending_name).is_file()) {
            return ProxyRecord {
                state: ProxyState::Pending,
                ready_path: dir.join(&ready_name),
                pending_path: dir.join(&pending_name),
            };
        }

        let dir = self.output_dir_path();
        ProxyRecord {
            state: ProxyState::Absent,
            ready_path: dir.join(&ready_name),
            pending_path: dir.join(&pending_name),
        }
    }

    /// Delete pending markers last modified more than `older_than` ago.
    ///
    /// Returns the removed paths. Markers of jobs that are still running are
    /// only safe to remove once the threshold exceeds the job timeout.
    pub fn clear_pending(&self, older_than: Duration) -> CacheResult<Vec<PathBuf>> {
        let now = SystemTime::now();
        let mut removed = Vec::new();

        for dir in self.search_dirs() {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            for entry in entries {
                let path = entry?.path();
                if MediaKind::of_pending_path(&path).is_none() {
                    continue;
                }
                let age = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .unwrap_or_default();
                if age < older_than {
                    continue;
                }
                match fs::remove_file(&path) {
                    Ok(()) => {
                        info!(marker = %path.display(), age_secs = age.as_secs(), "Removed stale pending marker");
                        removed.push(path);
                    }
                    Err(e) => warn!(marker = %path.display(), "Failed to remove pending marker: {}", e),
                }
            }
        }

        Ok(removed)
    }
}

/// The project folder itself must exist; its `proxies` child is created on demand.
fn project_root_exists(project_proxies: &Path) -> bool {
    project_proxies.parent().is_some_and(Path::is_dir)
}
