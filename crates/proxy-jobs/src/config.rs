//! Executor configuration.

use std::time::Duration;

/// Local executor configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum concurrent proxy jobs
    pub max_concurrent_jobs: usize,
    /// Per-job timeout; zero disables it
    pub job_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            job_timeout: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl ExecutorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_jobs: std::env::var("PROXY_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(2),
            job_timeout: Duration::from_secs(
                std::env::var("PROXY_JOB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        }
    }

    /// Timeout in whole seconds, `None` when disabled.
    pub fn timeout_secs(&self) -> Option<u64> {
        match self.job_timeout.as_secs() {
            0 => None,
            secs => Some(secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_secs() {
        assert_eq!(ExecutorConfig::default().timeout_secs(), Some(3600));

        let config = ExecutorConfig {
            job_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(config.timeout_secs(), None);
    }
}
