//! Post-completion actions.
//!
//! A pending proxy becomes ready only through one of these. Actions are
//! consumed by value so each runs at most once per job.

use std::path::{Path, PathBuf};

use proxy_media::{move_file, MediaResult};
use proxy_models::{keys, media::ready_path_for, Clip, ClipIdentity};
use tokio::fs;
use tracing::{info, warn};

use crate::error::{JobError, JobResult};

/// How the external tool finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed(String),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }
}

impl From<MediaResult<()>> for JobOutcome {
    fn from(result: MediaResult<()>) -> Self {
        match result {
            Ok(()) => JobOutcome::Succeeded,
            Err(e) => JobOutcome::Failed(e.to_string()),
        }
    }
}

/// Promote the pending file to its ready name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeAction {
    pub pending_path: PathBuf,
}

/// Promote, then point a live clip at the promoted proxy.
#[derive(Debug, Clone)]
pub struct ReplaceAction {
    pub original_resource: String,
    pub pending_path: PathBuf,
    pub identity: ClipIdentity,
    pub clip: Clip,
}

/// What happens after a derivation job exits.
#[derive(Debug)]
pub enum CompletionAction {
    Finalize(FinalizeAction),
    Replace(ReplaceAction),
}

impl CompletionAction {
    pub fn finalize(pending_path: impl Into<PathBuf>) -> Self {
        CompletionAction::Finalize(FinalizeAction {
            pending_path: pending_path.into(),
        })
    }

    pub fn replace(
        original_resource: impl Into<String>,
        pending_path: impl Into<PathBuf>,
        identity: ClipIdentity,
        clip: Clip,
    ) -> Self {
        CompletionAction::Replace(ReplaceAction {
            original_resource: original_resource.into(),
            pending_path: pending_path.into(),
            identity,
            clip,
        })
    }

    pub fn pending_path(&self) -> &Path {
        match self {
            CompletionAction::Finalize(a) => &a.pending_path,
            CompletionAction::Replace(a) => &a.pending_path,
        }
    }

    /// Run the action for a finished job, returning the ready path.
    ///
    /// A failed outcome or a missing pending file is an error; in that case
    /// nothing is renamed and the clip is left untouched.
    pub async fn complete(self, outcome: JobOutcome) -> JobResult<PathBuf> {
        if let JobOutcome::Failed(message) = outcome {
            warn!(pending = %self.pending_path().display(), "Proxy job failed, leaving marker in place");
            return Err(JobError::JobFailed(message));
        }

        match self {
            CompletionAction::Finalize(action) => promote(&action.pending_path).await,
            CompletionAction::Replace(action) => {
                let ready = promote(&action.pending_path).await?;
                let ready_str = ready.to_string_lossy().into_owned();
                action.clip.update(|p| {
                    p.set(keys::IS_PROXY, "1");
                    p.set(keys::ORIGINAL_RESOURCE, action.original_resource.as_str());
                    p.set(keys::RESOURCE, ready_str.as_str());
                });
                info!(identity = %action.identity, proxy = %ready.display(), "Clip switched to proxy");
                Ok(ready)
            }
        }
    }
}

/// Rename `<id>.pending.<ext>` to `<id>.<ext>` in the same directory.
async fn promote(pending: &Path) -> JobResult<PathBuf> {
    let ready = ready_path_for(pending).ok_or_else(|| JobError::InvalidPendingPath(pending.to_path_buf()))?;

    if !fs::try_exists(pending).await.unwrap_or(false) {
        return Err(JobError::MissingPending(pending.to_path_buf()));
    }

    move_file(pending, &ready).await?;
    info!(proxy = %ready.display(), "Proxy ready");
    Ok(ready)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pending_in(dir: &TempDir) -> PathBuf {
        let pending = dir.path().join("H.pending.mp4");
        std::fs::write(&pending, b"proxy").unwrap();
        pending
    }

    #[tokio::test]
    async fn test_finalize_promotes() {
        let dir = TempDir::new().unwrap();
        let pending = pending_in(&dir);

        let ready = CompletionAction::finalize(&pending)
            .complete(JobOutcome::Succeeded)
            .await
            .unwrap();

        assert_eq!(ready, dir.path().join("H.mp4"));
        assert!(ready.exists());
        assert!(!pending.exists());
    }

    #[tokio::test]
    async fn test_failed_outcome_leaves_marker() {
        let dir = TempDir::new().unwrap();
        let pending = pending_in(&dir);
        let clip = Clip::with_resource("avformat", "/media/a.mov");

        let result = CompletionAction::replace("/media/a.mov", &pending, ClipIdentity::new("H"), clip.clone())
            .complete(JobOutcome::Failed("exit status 1".into()))
            .await;

        assert!(matches!(result, Err(JobError::JobFailed(_))));
        assert!(pending.exists());
        assert!(!dir.path().join("H.mp4").exists());
        assert!(!clip.is_proxy());
        assert_eq!(clip.get(keys::RESOURCE).as_deref(), Some("/media/a.mov"));
    }

    #[tokio::test]
    async fn test_replace_retags_clip() {
        let dir = TempDir::new().unwrap();
        let pending = pending_in(&dir);
        let clip = Clip::with_resource("avformat", "/media/a.mov");

        let ready = CompletionAction::replace("/media/a.mov", &pending, ClipIdentity::new("H"), clip.clone())
            .complete(JobOutcome::Succeeded)
            .await
            .unwrap();

        assert!(clip.is_proxy());
        assert_eq!(clip.get(keys::ORIGINAL_RESOURCE).as_deref(), Some("/media/a.mov"));
        assert_eq!(clip.get(keys::RESOURCE), Some(ready.to_string_lossy().into_owned()));
    }

    #[tokio::test]
    async fn test_missing_pending_is_an_error() {
        let dir = TempDir::new().unwrap();
        let clip = Clip::with_resource("avformat", "/media/a.mov");

        let result = CompletionAction::replace(
            "/media/a.mov",
            dir.path().join("H.pending.mp4"),
            ClipIdentity::new("H"),
            clip.clone(),
        )
        .complete(JobOutcome::Succeeded)
        .await;

        assert!(matches!(result, Err(JobError::MissingPending(_))));
        assert!(!clip.is_proxy());
    }

    #[tokio::test]
    async fn test_non_pending_path_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("H.mp4");
        std::fs::write(&path, b"proxy").unwrap();

        let result = CompletionAction::finalize(&path).complete(JobOutcome::Succeeded).await;
        assert!(matches!(result, Err(JobError::InvalidPendingPath(_))));
        assert!(path.exists());
    }
}
