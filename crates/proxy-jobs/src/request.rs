//! Derivation requests.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use proxy_media::{FfmpegCommand, MeltCommand, Tool};
use proxy_models::JobId;

use crate::action::CompletionAction;

/// A fully built proxy job.
///
/// Immutable once built; the job subsystem owns it after submission and
/// consumes `completion` when the tool exits.
#[derive(Debug)]
pub struct DerivationRequest {
    /// Unique job ID
    pub job_id: JobId,
    /// Source media resource
    pub source: String,
    /// Program to run
    pub tool: Tool,
    /// Complete argument list
    pub args: Vec<String>,
    /// Pending output path
    pub output: PathBuf,
    /// Human readable label
    pub label: String,
    /// Action run once the tool has exited
    pub completion: CompletionAction,
    /// When the request was built
    pub created_at: DateTime<Utc>,
}

impl DerivationRequest {
    pub fn new(
        tool: Tool,
        source: impl Into<String>,
        args: Vec<String>,
        output: impl Into<PathBuf>,
        label: impl Into<String>,
        completion: CompletionAction,
    ) -> Self {
        Self {
            job_id: JobId::new(),
            source: source.into(),
            tool,
            args,
            output: output.into(),
            label: label.into(),
            completion,
            created_at: Utc::now(),
        }
    }

    /// Build an ffmpeg job from a finished command.
    pub fn ffmpeg(
        source: impl Into<String>,
        command: &FfmpegCommand,
        label: impl Into<String>,
        completion: CompletionAction,
    ) -> Self {
        Self::new(
            Tool::Ffmpeg,
            source,
            command.build_args(),
            command.output(),
            label,
            completion,
        )
    }

    /// Build a melt job from a finished command.
    pub fn melt(
        source: impl Into<String>,
        command: &MeltCommand,
        label: impl Into<String>,
        completion: CompletionAction,
    ) -> Self {
        Self::new(
            Tool::Melt,
            source,
            command.build_args(),
            command.output(),
            label,
            completion,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_request_takes_command_output() {
        let command = FfmpegCommand::new("/media/a.mov", "/cache/H.pending.mp4");
        let request = DerivationRequest::ffmpeg(
            "/media/a.mov",
            &command,
            "Make proxy for a.mov",
            CompletionAction::finalize("/cache/H.pending.mp4"),
        );

        assert_eq!(request.tool, Tool::Ffmpeg);
        assert_eq!(request.output, PathBuf::from("/cache/H.pending.mp4"));
        assert_eq!(request.args, command.build_args());
        assert_eq!(request.label, "Make proxy for a.mov");
    }

    #[test]
    fn test_requests_get_distinct_ids() {
        let a = DerivationRequest::new(
            Tool::Melt,
            "a.jpg",
            vec![],
            "a.pending.jpg",
            "a",
            CompletionAction::finalize("a.pending.jpg"),
        );
        let b = DerivationRequest::new(
            Tool::Melt,
            "b.jpg",
            vec![],
            "b.pending.jpg",
            "b",
            CompletionAction::finalize("b.pending.jpg"),
        );
        assert_ne!(a.job_id, b.job_id);
    }
}
