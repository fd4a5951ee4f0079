//! Proxy generation for single clips and whole media graphs.

use std::path::{Path, PathBuf};

use proxy_jobs::{CompletionAction, DerivationRequest, JobQueue};
use proxy_media::touch_marker;
use proxy_models::{keys, Clip, ClipIdentity, IdentityProvider, JobId, MediaKind, MediaNode, ProxyRecord, ProxySettings, ProxyState};
use tracing::{debug, info, warn};

use crate::descriptor::{image_proxy_command, video_proxy_command, VideoProxyOptions};
use crate::error::{CacheError, CacheResult};
use crate::locator::{media_kind, service_kind, ProxyDirs};
use crate::scanner::find_non_proxy_clips;

/// The media a proxy should be derived from.
///
/// A clip already pointing at a proxy renders from its stashed original,
/// and a speed-changed clip from its underlying file.
pub fn effective_resource(clip: &Clip) -> String {
    if clip.is_proxy() {
        if let Some(original) = clip.get(keys::ORIGINAL_RESOURCE) {
            return original;
        }
    }
    if clip.service() == keys::TIMEWARP_SERVICE {
        return clip.get(keys::WARP_RESOURCE).unwrap_or_default();
    }
    clip.get(keys::RESOURCE).unwrap_or_default()
}

fn job_label(resource: &str) -> String {
    let name = Path::new(resource)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| resource.to_string());
    format!("Make proxy for {}", name)
}

/// Looks up proxies and submits derivation jobs for missing ones.
pub struct ProxyManager<H, Q> {
    settings: ProxySettings,
    identity: H,
    queue: Q,
}

impl<H: IdentityProvider, Q: JobQueue> ProxyManager<H, Q> {
    pub fn new(settings: ProxySettings, identity: H, queue: Q) -> Self {
        Self {
            settings,
            identity,
            queue,
        }
    }

    pub fn settings(&self) -> &ProxySettings {
        &self.settings
    }

    pub fn dirs(&self) -> ProxyDirs {
        ProxyDirs::from_settings(&self.settings)
    }

    /// Cache record for `clip`, or `None` when it has no identity or no
    /// proxy kind matches its service.
    pub fn locate(&self, clip: &Clip) -> Option<ProxyRecord> {
        let kind = service_kind(clip)?;
        let identity = self.identity.identity(clip)?;
        Some(self.dirs().locate(&identity, kind))
    }

    pub fn file_exists(&self, clip: &Clip) -> bool {
        self.locate(clip).is_some_and(|r| r.is_ready())
    }

    pub fn file_pending(&self, clip: &Clip) -> bool {
        self.locate(clip).is_some_and(|r| r.is_pending())
    }

    /// Touch the pending marker and submit an ffmpeg proxy job for `clip`.
    pub fn generate_video_proxy(
        &self,
        clip: &Clip,
        options: &VideoProxyOptions,
        replace: bool,
    ) -> CacheResult<JobId> {
        let (identity, resource, pending) = self.prepare(clip, MediaKind::Video)?;
        let command = video_proxy_command(clip, &resource, options, &self.settings, &pending);
        let completion = completion_action(&resource, &pending, identity, clip, replace);
        let request = DerivationRequest::ffmpeg(&resource, &command, job_label(&resource), completion);
        self.submit(request)
    }

    /// Touch the pending marker and submit a melt proxy job for the still `clip`.
    pub fn generate_image_proxy(&self, clip: &Clip, replace: bool) -> CacheResult<JobId> {
        let (identity, resource, pending) = self.prepare(clip, MediaKind::Image)?;
        let command = image_proxy_command(clip, &resource, self.settings.resolution(), &pending);
        let completion = completion_action(&resource, &pending, identity, clip, replace);
        let request = DerivationRequest::melt(&resource, &command, job_label(&resource), completion);
        self.submit(request)
    }

    /// Marker first, so a concurrent lookup already sees the job as pending.
    fn prepare(&self, clip: &Clip, kind: MediaKind) -> CacheResult<(ClipIdentity, String, PathBuf)> {
        let identity = self.identity.identity(clip).ok_or(CacheError::NoIdentity)?;
        let resource = effective_resource(clip);
        let pending = self.dirs().output_dir()?.join(identity.file_name(kind.pending_suffix()));

        touch_marker(&pending).map_err(|source| CacheError::Marker {
            path: pending.clone(),
            source,
        })?;
        debug!(marker = %pending.display(), identity = %identity, "Touched pending marker");

        Ok((identity, resource, pending))
    }

    /// A rejected submission takes its marker with it, so the clip does not
    /// read as pending without a job.
    fn submit(&self, request: DerivationRequest) -> CacheResult<JobId> {
        let label = request.label.clone();
        let marker = request.output.clone();
        match self.queue.submit(request) {
            Ok(job_id) => {
                info!(job_id = %job_id, "Submitted: {}", label);
                Ok(job_id)
            }
            Err(e) => {
                warn!(marker = %marker.display(), error = %e, "Submission rejected: {}", label);
                if let Err(remove) = std::fs::remove_file(&marker) {
                    warn!(marker = %marker.display(), "Failed to remove pending marker: {}", remove);
                }
                Err(e.into())
            }
        }
    }

    /// Use an existing proxy for `clip` or start making one.
    ///
    /// Returns true only when the clip was switched to a ready proxy. A
    /// missing proxy is scheduled when the source exceeds the size
    /// threshold in both dimensions and no job is already pending.
    pub fn generate_if_not_exists(&self, clip: &Clip, replace: bool) -> bool {
        if !self.settings.enabled {
            return false;
        }
        let Some(kind) = media_kind(clip) else {
            return false;
        };
        let Some(identity) = self.identity.identity(clip) else {
            debug!("Clip has no identity, skipping proxy");
            return false;
        };

        let record = self.dirs().locate(&identity, kind);
        match record.state {
            ProxyState::Ready => {
                clip.update(|p| {
                    let resource = p.get(keys::RESOURCE).unwrap_or_default().to_string();
                    p.set_int(keys::IS_PROXY, 1);
                    p.set(keys::ORIGINAL_RESOURCE, resource);
                    p.set(keys::RESOURCE, record.ready_path.to_string_lossy());
                });
                debug!(proxy = %record.ready_path.display(), "Using existing proxy");
                true
            }
            ProxyState::Pending => false,
            ProxyState::Absent => {
                let threshold = self.settings.size_threshold();
                let width = clip.get_int(keys::META_WIDTH);
                let height = clip.get_int(keys::META_HEIGHT);
                if width > threshold && height > threshold {
                    let result = match kind {
                        MediaKind::Video => {
                            self.generate_video_proxy(clip, &VideoProxyOptions::for_clip(clip), replace)
                        }
                        MediaKind::Image => self.generate_image_proxy(clip, replace),
                    };
                    if let Err(e) = result {
                        warn!(identity = %identity, "Failed to start {} proxy: {}", kind, e);
                    }
                } else {
                    debug!(width, height, threshold, "Source too small for a proxy");
                }
                false
            }
        }
    }

    /// Run [`Self::generate_if_not_exists`] for every non-proxy clip in
    /// `graph`, then mark each of them as a proxy.
    ///
    /// Returns the number of clips visited.
    pub fn generate_if_not_exists_all(&self, graph: &MediaNode) -> usize {
        let clips = find_non_proxy_clips(graph);
        for clip in &clips {
            self.generate_if_not_exists(clip, false);
            clip.set_int(keys::IS_PROXY, 1);
        }
        info!(clips = clips.len(), "Scanned media graph for proxies");
        clips.len()
    }
}

fn completion_action(
    resource: &str,
    pending: &Path,
    identity: ClipIdentity,
    clip: &Clip,
    replace: bool,
) -> CompletionAction {
    if replace {
        CompletionAction::replace(resource, pending, identity, clip.clone())
    } else {
        CompletionAction::finalize(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use proxy_jobs::{JobError, JobResult};
    use proxy_models::{Multitrack, Playlist, PlaylistEntry, StoredHashIdentity, Track};
    use std::fs;
    use tempfile::TempDir;

    mock! {
        pub Queue {}
        impl JobQueue for Queue {
            fn submit(&self, request: DerivationRequest) -> JobResult<JobId>;
        }
    }

    fn settings(root: &TempDir) -> ProxySettings {
        ProxySettings::default().with_proxy_folder(root.path().join("proxies"))
    }

    fn video_clip(hash: &str, width: i64, height: i64) -> Clip {
        let clip = Clip::with_resource("avformat-novalidate", "/media/shoot/a.mov");
        clip.set(keys::HASH, hash);
        clip.set_int(keys::META_WIDTH, width);
        clip.set_int(keys::META_HEIGHT, height);
        clip
    }

    fn accept_all(queue: &mut MockQueue, times: usize) {
        queue
            .expect_submit()
            .times(times)
            .returning(|request| Ok(request.job_id.clone()));
    }

    #[test]
    fn test_effective_resource() {
        let plain = Clip::with_resource("avformat", "/a.mov");
        assert_eq!(effective_resource(&plain), "/a.mov");

        let proxied = Clip::with_resource("avformat", "/cache/H.mp4");
        proxied.set_int(keys::IS_PROXY, 1);
        proxied.set(keys::ORIGINAL_RESOURCE, "/a.mov");
        assert_eq!(effective_resource(&proxied), "/a.mov");

        let warped = Clip::with_resource("timewarp", "2.0:/a.mov");
        warped.set(keys::WARP_RESOURCE, "/a.mov");
        assert_eq!(effective_resource(&warped), "/a.mov");
    }

    #[test]
    fn test_job_label_uses_file_name() {
        assert_eq!(job_label("/media/shoot/a.mov"), "Make proxy for a.mov");
    }

    #[test]
    fn test_video_job_marker_exists_before_submit() {
        let root = TempDir::new().unwrap();
        let mut queue = MockQueue::new();
        queue.expect_submit().times(1).returning(|request| {
            assert!(request.output.is_file());
            assert_eq!(fs::metadata(&request.output).unwrap().len(), 0);
            assert_eq!(request.output.file_name().unwrap(), "H.pending.mp4");
            assert_eq!(request.label, "Make proxy for a.mov");
            assert!(matches!(request.completion, CompletionAction::Finalize(_)));
            Ok(request.job_id.clone())
        });

        let manager = ProxyManager::new(settings(&root), StoredHashIdentity, queue);
        let clip = video_clip("H", 1920, 1080);
        manager
            .generate_video_proxy(&clip, &VideoProxyOptions::default(), false)
            .unwrap();

        assert!(manager.file_pending(&clip));
        assert!(!manager.file_exists(&clip));
    }

    #[test]
    fn test_rejected_submission_removes_marker() {
        let root = TempDir::new().unwrap();
        let mut queue = MockQueue::new();
        queue
            .expect_submit()
            .times(1)
            .returning(|_| Err(JobError::QueueClosed));

        let manager = ProxyManager::new(settings(&root), StoredHashIdentity, queue);
        let clip = video_clip("H", 1920, 1080);
        let result = manager.generate_video_proxy(&clip, &VideoProxyOptions::default(), false);

        assert!(matches!(result, Err(CacheError::Job(JobError::QueueClosed))));
        assert!(!root.path().join("proxies").join("H.pending.mp4").exists());
        assert!(!manager.file_pending(&clip));
        assert_eq!(manager.locate(&clip).unwrap().state, ProxyState::Absent);
    }

    #[test]
    fn test_replace_carries_clip() {
        let root = TempDir::new().unwrap();
        let clip = video_clip("H", 1920, 1080);
        let expected = clip.clone();

        let mut queue = MockQueue::new();
        queue.expect_submit().times(1).returning(move |request| {
            match &request.completion {
                CompletionAction::Replace(action) => {
                    assert_eq!(action.original_resource, "/media/shoot/a.mov");
                    assert_eq!(action.identity.as_str(), "H");
                    assert!(action.clip.ptr_eq(&expected));
                }
                other => panic!("unexpected completion {:?}", other),
            }
            Ok(request.job_id.clone())
        });

        let manager = ProxyManager::new(settings(&root), StoredHashIdentity, queue);
        manager
            .generate_video_proxy(&clip, &VideoProxyOptions::default(), true)
            .unwrap();
    }

    #[test]
    fn test_missing_identity_submits_nothing() {
        let root = TempDir::new().unwrap();
        let mut queue = MockQueue::new();
        queue.expect_submit().never();

        let manager = ProxyManager::new(settings(&root), StoredHashIdentity, queue);
        let clip = Clip::with_resource("avformat", "/a.mov");

        let err = manager
            .generate_video_proxy(&clip, &VideoProxyOptions::default(), false)
            .unwrap_err();
        assert!(matches!(err, CacheError::NoIdentity));
    }

    #[test]
    fn test_second_request_while_pending_is_skipped() {
        let root = TempDir::new().unwrap();
        let mut queue = MockQueue::new();
        accept_all(&mut queue, 1);

        let manager = ProxyManager::new(settings(&root), StoredHashIdentity, queue);
        let clip = video_clip("H", 1920, 1080);

        assert!(!manager.generate_if_not_exists(&clip, false));
        assert!(!manager.generate_if_not_exists(&clip, false));
        assert!(manager.file_pending(&clip));
    }

    #[test]
    fn test_small_source_is_not_proxied() {
        let root = TempDir::new().unwrap();
        let mut queue = MockQueue::new();
        queue.expect_submit().never();

        let manager = ProxyManager::new(settings(&root), StoredHashIdentity, queue);
        // Wide but short: both dimensions must exceed the threshold
        let clip = video_clip("H", 3840, 400);

        assert!(!manager.generate_if_not_exists(&clip, false));
        assert!(!manager.file_pending(&clip));
    }

    #[test]
    fn test_ready_proxy_retags_clip() {
        let root = TempDir::new().unwrap();
        let settings = settings(&root);
        fs::create_dir_all(&settings.proxy_folder).unwrap();
        let ready = settings.proxy_folder.join("H.mp4");
        fs::write(&ready, b"proxy").unwrap();

        let mut queue = MockQueue::new();
        queue.expect_submit().never();
        let manager = ProxyManager::new(settings, StoredHashIdentity, queue);
        let clip = video_clip("H", 1920, 1080);

        assert!(manager.generate_if_not_exists(&clip, false));
        assert!(clip.is_proxy());
        assert_eq!(clip.get(keys::ORIGINAL_RESOURCE).as_deref(), Some("/media/shoot/a.mov"));
        assert_eq!(clip.get(keys::RESOURCE), Some(ready.to_string_lossy().into_owned()));
    }

    #[test]
    fn test_disabled_settings_do_nothing() {
        let root = TempDir::new().unwrap();
        let mut settings = settings(&root);
        settings.enabled = false;

        let mut queue = MockQueue::new();
        queue.expect_submit().never();
        let manager = ProxyManager::new(settings, StoredHashIdentity, queue);

        assert!(!manager.generate_if_not_exists(&video_clip("H", 1920, 1080), false));
    }

    #[test]
    fn test_image_job_uses_melt() {
        let root = TempDir::new().unwrap();
        let mut queue = MockQueue::new();
        queue.expect_submit().times(1).returning(|request| {
            assert_eq!(request.tool, proxy_media::Tool::Melt);
            assert_eq!(request.output.file_name().unwrap(), "P.pending.jpg");
            Ok(request.job_id.clone())
        });

        let manager = ProxyManager::new(settings(&root), StoredHashIdentity, queue);
        let clip = Clip::with_resource("qimage", "/photos/a.jpg");
        clip.set(keys::HASH, "P");
        clip.set_int(keys::META_WIDTH, 4000);
        clip.set_int(keys::META_HEIGHT, 3000);

        assert!(!manager.generate_if_not_exists(&clip, false));
    }

    #[test]
    fn test_generate_all_skips_existing_proxies() {
        let root = TempDir::new().unwrap();
        let mut queue = MockQueue::new();
        accept_all(&mut queue, 1);
        let manager = ProxyManager::new(settings(&root), StoredHashIdentity, queue);

        let source = video_clip("A", 1920, 1080);
        let proxied = video_clip("B", 1920, 1080);
        proxied.set_int(keys::IS_PROXY, 1);

        let graph = MediaNode::Multitrack(Multitrack {
            tracks: vec![Track {
                node: MediaNode::Playlist(Playlist {
                    entries: vec![
                        PlaylistEntry::Clip(source.clone().into()),
                        PlaylistEntry::Blank(10),
                        PlaylistEntry::Clip(proxied.clone().into()),
                    ],
                    filters: Vec::new(),
                }),
            }],
            ..Default::default()
        });

        assert_eq!(manager.generate_if_not_exists_all(&graph), 1);
        assert!(source.is_proxy());
        assert!(manager.file_pending(&source));
    }
}
