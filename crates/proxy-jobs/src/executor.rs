//! Local job executor.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, Instrument};

use proxy_models::JobId;

use crate::config::ExecutorConfig;
use crate::logging::JobLogger;
use crate::metrics;
use crate::queue::LocalJobQueue;
use crate::request::DerivationRequest;
use crate::runner::JobRunner;

/// Final state of one executed job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: JobId,
    pub label: String,
    /// Ready path on success, error message otherwise
    pub result: Result<PathBuf, String>,
}

/// Create a connected queue and executor.
pub fn local_queue<R: JobRunner>(config: ExecutorConfig, runner: R) -> (LocalJobQueue, JobExecutor<R>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (LocalJobQueue::new(sender), JobExecutor::new(config, runner, receiver))
}

/// Executes submitted requests with bounded concurrency.
///
/// Every request's completion action runs exactly once, whatever the tool's
/// outcome.
pub struct JobExecutor<R: JobRunner> {
    config: ExecutorConfig,
    runner: Arc<R>,
    job_semaphore: Arc<Semaphore>,
    receiver: mpsc::UnboundedReceiver<DerivationRequest>,
}

impl<R: JobRunner> JobExecutor<R> {
    fn new(config: ExecutorConfig, runner: R, receiver: mpsc::UnboundedReceiver<DerivationRequest>) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        Self {
            config,
            runner: Arc::new(runner),
            job_semaphore,
            receiver,
        }
    }

    /// Run until every queue handle is dropped and all jobs have finished.
    pub async fn run(mut self) -> Vec<JobReport> {
        info!(
            "Starting proxy job executor with {} max concurrent jobs",
            self.config.max_concurrent_jobs
        );

        let mut tasks = JoinSet::new();
        while let Some(request) = self.receiver.recv().await {
            let Ok(permit) = Arc::clone(&self.job_semaphore).acquire_owned().await else {
                break;
            };
            let runner = Arc::clone(&self.runner);
            tasks.spawn(async move {
                let _permit = permit;
                Self::execute_job(runner, request).await
            });
        }

        let mut reports = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => error!("Proxy job task aborted: {}", e),
            }
        }

        info!("Proxy job executor stopped after {} jobs", reports.len());
        reports
    }

    /// Run one request and its completion action.
    async fn execute_job(runner: Arc<R>, request: DerivationRequest) -> JobReport {
        let logger = JobLogger::new(&request.job_id, request.tool, &request.output);
        let span = logger.span();

        async move {
            logger.started(&request.label);
            let started = Instant::now();

            let outcome = runner.run(&request, &logger).await;

            let DerivationRequest {
                job_id,
                tool,
                label,
                completion,
                ..
            } = request;
            let result = completion.complete(outcome).await;

            match &result {
                Ok(ready) => {
                    metrics::record_job_completed(tool.binary_name(), started.elapsed().as_secs_f64());
                    logger.promoted(ready);
                }
                Err(e) => {
                    metrics::record_job_failed(tool.binary_name());
                    logger.abandoned(&e.to_string());
                }
            }

            JobReport {
                job_id,
                label,
                result: result.map_err(|e| e.to_string()),
            }
        }
        .instrument(span)
        .await
    }
}
