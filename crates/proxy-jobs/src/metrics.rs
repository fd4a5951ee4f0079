//! Proxy job metrics.
//!
//! Recorded through the `metrics` facade; installing an exporter is up to
//! the host binary.

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

pub mod names {
    /// Proxy jobs handed to the queue, by tool.
    pub const JOBS_SUBMITTED_TOTAL: &str = "proxycache_jobs_submitted_total";

    /// Proxy jobs promoted to ready, by tool.
    pub const JOBS_COMPLETED_TOTAL: &str = "proxycache_jobs_completed_total";

    /// Proxy jobs that left their marker behind, by tool.
    pub const JOBS_FAILED_TOTAL: &str = "proxycache_jobs_failed_total";

    /// Wall time from tool start to completion action, by tool.
    pub const JOB_DURATION_SECONDS: &str = "proxycache_job_duration_seconds";
}

// =============================================================================
// Recording Functions
// =============================================================================

pub fn record_job_submitted(tool: &str) {
    counter!(names::JOBS_SUBMITTED_TOTAL, "tool" => tool.to_string()).increment(1);
}

pub fn record_job_completed(tool: &str, duration_secs: f64) {
    counter!(names::JOBS_COMPLETED_TOTAL, "tool" => tool.to_string()).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "tool" => tool.to_string()).record(duration_secs);
}

pub fn record_job_failed(tool: &str) {
    counter!(names::JOBS_FAILED_TOTAL, "tool" => tool.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::JOBS_SUBMITTED_TOTAL.contains("submitted"));
        assert!(names::JOBS_FAILED_TOTAL.ends_with("_total"));
        assert!(names::JOB_DURATION_SECONDS.ends_with("_seconds"));
    }
}
