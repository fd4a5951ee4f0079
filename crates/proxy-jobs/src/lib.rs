//! Proxy derivation jobs.
//!
//! This crate provides:
//! - The immutable derivation request handed to the job subsystem
//! - Completion actions that promote a pending proxy exactly once
//! - The `JobQueue` submission seam with an in-process implementation
//! - A semaphore-bounded executor running ffmpeg and melt

pub mod action;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod queue;
pub mod request;
pub mod runner;

pub use action::{CompletionAction, FinalizeAction, JobOutcome, ReplaceAction};
pub use config::ExecutorConfig;
pub use error::{JobError, JobResult};
pub use executor::{local_queue, JobExecutor, JobReport};
pub use logging::JobLogger;
pub use queue::{JobQueue, LocalJobQueue};
pub use request::DerivationRequest;
pub use runner::{JobRunner, ProcessJobRunner};
