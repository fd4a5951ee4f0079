//! Tool execution for derivation requests.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use proxy_media::ToolRunner;

use crate::action::JobOutcome;
use crate::config::ExecutorConfig;
use crate::logging::JobLogger;
use crate::request::DerivationRequest;

/// Runs the external program of a request.
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    async fn run(&self, request: &DerivationRequest, logger: &JobLogger) -> JobOutcome;
}

/// Spawns ffmpeg or melt as a child process.
#[derive(Debug, Clone, Default)]
pub struct ProcessJobRunner {
    timeout_secs: Option<u64>,
}

impl ProcessJobRunner {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            timeout_secs: config.timeout_secs(),
        }
    }

    fn tool_runner(&self) -> ToolRunner {
        match self.timeout_secs {
            Some(secs) => ToolRunner::new().with_timeout(secs),
            None => ToolRunner::new(),
        }
    }
}

#[async_trait]
impl JobRunner for ProcessJobRunner {
    async fn run(&self, request: &DerivationRequest, logger: &JobLogger) -> JobOutcome {
        let progress_logger = logger.clone();
        // Log each 10% step once
        let last_step = AtomicI64::new(-1);

        let result = self
            .tool_runner()
            .run_with_progress(request.tool, &request.args, move |progress| {
                let Some(percent) = progress.percent else {
                    return;
                };
                let step = (percent / 10.0).floor() as i64;
                if last_step.swap(step, Ordering::Relaxed) != step {
                    progress_logger.progress(percent);
                }
            })
            .await;

        if let Err(e) = &result {
            logger.tool_failed(&e.to_string());
        }
        JobOutcome::from(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_timeout_from_config() {
        let runner = ProcessJobRunner::new(&ExecutorConfig {
            max_concurrent_jobs: 1,
            job_timeout: Duration::from_secs(90),
        });
        assert_eq!(runner.timeout_secs, Some(90));
        assert_eq!(ProcessJobRunner::default().timeout_secs, None);
    }
}
