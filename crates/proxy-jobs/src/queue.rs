//! Job submission seam.

use std::sync::Arc;

use proxy_models::JobId;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{JobError, JobResult};
use crate::metrics;
use crate::request::DerivationRequest;

/// Hands derivation requests to whatever executes them.
///
/// `submit` must not block; the request is owned by the queue afterwards.
pub trait JobQueue: Send + Sync {
    fn submit(&self, request: DerivationRequest) -> JobResult<JobId>;
}

impl<Q: JobQueue + ?Sized> JobQueue for Arc<Q> {
    fn submit(&self, request: DerivationRequest) -> JobResult<JobId> {
        (**self).submit(request)
    }
}

/// In-process queue feeding a [`crate::JobExecutor`].
#[derive(Debug, Clone)]
pub struct LocalJobQueue {
    sender: mpsc::UnboundedSender<DerivationRequest>,
}

impl LocalJobQueue {
    pub(crate) fn new(sender: mpsc::UnboundedSender<DerivationRequest>) -> Self {
        Self { sender }
    }
}

impl JobQueue for LocalJobQueue {
    fn submit(&self, request: DerivationRequest) -> JobResult<JobId> {
        let job_id = request.job_id.clone();
        let tool = request.tool;
        debug!(job_id = %job_id, label = %request.label, "Submitting proxy job");

        self.sender.send(request).map_err(|_| JobError::QueueClosed)?;
        metrics::record_job_submitted(tool.binary_name());
        Ok(job_id)
    }
}
