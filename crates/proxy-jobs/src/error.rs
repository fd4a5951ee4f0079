//! Job error types.

use std::path::PathBuf;

use proxy_media::MediaError;
use thiserror::Error;

pub type JobResult<T> = Result<T, JobError>;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Pending proxy missing: {0}")]
    MissingPending(PathBuf),

    #[error("Not a pending proxy path: {0}")]
    InvalidPendingPath(PathBuf),

    #[error("Job queue closed")]
    QueueClosed,

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
