//! Asynchronous job orchestration for GenHub.
//!
//! This crate provides:
//! - An in-memory job store with per-owner admission control and
//!   retention-based eviction
//! - A processor registry mapping job types to typed execution logic
//! - A single-flight job runner that drives jobs to a terminal status
//! - A dispatcher that runs processors inline or queues them, depending
//!   on the deployment's execution mode
//! - A fixed-delay retry helper for flaky upstream calls
//! - Built-in image generation and fusion processors

pub mod dispatch;
pub mod executor;
pub mod jobs;
pub mod retry;
pub mod runner;
pub mod scheduler;
pub mod store;

pub use dispatch::{JobDispatcher, Submission};
pub use executor::{JobContext, JobProcessor, Processor, ProcessorError, ProcessorRegistry};
pub use retry::{RetryPolicy, with_retry};
pub use runner::{JobRunner, RunOutcome, SkipReason};
pub use scheduler::EvictionScheduler;
pub use store::{JobStats, JobStore};
