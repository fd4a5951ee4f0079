//! Lookup, submission, execution and promotion wired together.

use async_trait::async_trait;
use proxy_cache::{ProxyManager, VideoProxyOptions};
use proxy_jobs::{local_queue, DerivationRequest, ExecutorConfig, JobLogger, JobOutcome, JobRunner};
use proxy_models::{keys, Clip, ProxySettings, ProxyState, StoredHashIdentity};
use tempfile::TempDir;

/// Writes a fake proxy instead of running the tool.
struct WritingRunner;

#[async_trait]
impl JobRunner for WritingRunner {
    async fn run(&self, request: &DerivationRequest, _logger: &JobLogger) -> JobOutcome {
        match tokio::fs::write(&request.output, b"proxy").await {
            Ok(()) => JobOutcome::Succeeded,
            Err(e) => JobOutcome::Failed(e.to_string()),
        }
    }
}

fn source_clip() -> Clip {
    let clip = Clip::with_resource("avformat", "/media/shoot/a.mov");
    clip.set(keys::HASH, "H");
    clip.set_int(keys::META_WIDTH, 1920);
    clip.set_int(keys::META_HEIGHT, 1080);
    clip
}

#[tokio::test]
async fn test_finalize_pipeline() {
    let root = TempDir::new().unwrap();
    let settings = ProxySettings::default().with_proxy_folder(root.path().join("proxies"));
    let (queue, executor) = local_queue(ExecutorConfig::default(), WritingRunner);
    let manager = ProxyManager::new(settings.clone(), StoredHashIdentity, queue);
    let clip = source_clip();

    assert_eq!(manager.locate(&clip).unwrap().state, ProxyState::Absent);
    manager
        .generate_video_proxy(&clip, &VideoProxyOptions::for_clip(&clip), false)
        .unwrap();
    assert_eq!(manager.locate(&clip).unwrap().state, ProxyState::Pending);
    drop(manager);

    let reports = executor.run().await;
    assert_eq!(reports.len(), 1);
    let ready = reports[0].result.clone().unwrap();
    assert_eq!(ready, settings.proxy_folder.join("H.mp4"));

    let manager = ProxyManager::new(settings, StoredHashIdentity, idle_queue());
    let record = manager.locate(&clip).unwrap();
    assert_eq!(record.state, ProxyState::Ready);
    assert_eq!(record.ready_path, ready);
    assert!(!record.pending_path.exists());

    // Finalize never touches the clip
    assert!(!clip.is_proxy());
    assert_eq!(clip.get(keys::RESOURCE).as_deref(), Some("/media/shoot/a.mov"));
}

#[tokio::test]
async fn test_replace_pipeline_retags_clip() {
    let root = TempDir::new().unwrap();
    let settings = ProxySettings::default().with_proxy_folder(root.path().join("proxies"));
    let (queue, executor) = local_queue(ExecutorConfig::default(), WritingRunner);
    let manager = ProxyManager::new(settings.clone(), StoredHashIdentity, queue);
    let clip = source_clip();

    assert!(!manager.generate_if_not_exists(&clip, true));
    // Already pending, nothing new is submitted
    assert!(!manager.generate_if_not_exists(&clip, true));
    drop(manager);

    let reports = executor.run().await;
    assert_eq!(reports.len(), 1);

    let ready = settings.proxy_folder.join("H.mp4");
    assert!(clip.is_proxy());
    assert_eq!(clip.get(keys::ORIGINAL_RESOURCE).as_deref(), Some("/media/shoot/a.mov"));
    assert_eq!(clip.get(keys::RESOURCE), Some(ready.to_string_lossy().into_owned()));
}

/// Queue for lookups after the executor has drained.
fn idle_queue() -> proxy_jobs::LocalJobQueue {
    let (queue, _executor) = local_queue(ExecutorConfig::default(), WritingRunner);
    queue
}
