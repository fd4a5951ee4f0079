//! Cache error types.

use std::path::PathBuf;

use proxy_jobs::JobError;
use proxy_media::MediaError;
use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Clip has no identity")]
    NoIdentity,

    #[error("Cannot create pending marker {path}: {source}")]
    Marker {
        path: PathBuf,
        #[source]
        source: MediaError,
    },

    #[error("Job submission failed: {0}")]
    Job(#[from] JobError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
