//! Structured proxy job logging.

use std::path::{Path, PathBuf};

use proxy_media::Tool;
use proxy_models::JobId;
use tracing::{info, warn, Span};

/// Logs the lifecycle of one proxy job with its ID, tool and pending output
/// attached to every event.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: JobId,
    tool: Tool,
    output: PathBuf,
}

impl JobLogger {
    pub fn new(job_id: &JobId, tool: Tool, output: impl Into<PathBuf>) -> Self {
        Self {
            job_id: job_id.clone(),
            tool,
            output: output.into(),
        }
    }

    pub fn started(&self, label: &str) {
        info!(
            job_id = %self.job_id,
            tool = %self.tool,
            output = %self.output.display(),
            "Proxy job started: {}", label
        );
    }

    pub fn progress(&self, percent: f64) {
        info!(job_id = %self.job_id, tool = %self.tool, "Proxy job at {:.0}%", percent);
    }

    /// The tool exited unsuccessfully; the completion action decides what
    /// happens to the marker.
    pub fn tool_failed(&self, message: &str) {
        warn!(job_id = %self.job_id, tool = %self.tool, "{} exited with error: {}", self.tool, message);
    }

    pub fn promoted(&self, ready: &Path) {
        info!(
            job_id = %self.job_id,
            tool = %self.tool,
            ready = %ready.display(),
            "Proxy ready"
        );
    }

    pub fn abandoned(&self, reason: &str) {
        warn!(
            job_id = %self.job_id,
            tool = %self.tool,
            marker = %self.output.display(),
            "Proxy job failed: {}", reason
        );
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Span carrying the job fields, for instrumenting the whole job.
    pub fn span(&self) -> Span {
        tracing::info_span!("proxy_job", job_id = %self.job_id, tool = %self.tool)
    }
}
