//! Media tool errors.

use std::path::PathBuf;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0} not found in PATH")]
    ToolNotFound(&'static str),

    /// Non-zero exit. `stderr_tail` holds the last lines the tool printed.
    #[error("{tool} exited unsuccessfully (code {})", exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    ToolExited {
        tool: &'static str,
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    #[error("{0} stderr was not captured")]
    StderrUnavailable(&'static str),

    #[error("ffprobe failed on {path}: {stderr}")]
    ProbeFailed { path: PathBuf, stderr: String },

    #[error("No audio or video stream in probe output")]
    NoMediaStreams,

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Tool run timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Probe output is not valid JSON: {0}")]
    ProbeJson(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_message() {
        let err = MediaError::ToolExited {
            tool: "ffmpeg",
            exit_code: Some(1),
            stderr_tail: "Unknown encoder".into(),
        };
        assert_eq!(err.to_string(), "ffmpeg exited unsuccessfully (code 1)");

        let killed = MediaError::ToolExited {
            tool: "melt",
            exit_code: None,
            stderr_tail: String::new(),
        };
        assert_eq!(killed.to_string(), "melt exited unsuccessfully (code none)");
    }
}
