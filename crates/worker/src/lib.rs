//! Kublade queue worker.
//!
//! Claims jobs from the shared queue and runs them. Besides the job runner it
//! keeps three periodic tasks: the worker heartbeat, the import scheduler,
//! and the reaper for jobs orphaned by a crashed worker.

pub mod config;
pub mod git;
pub mod heartbeat;
pub mod jobs;
pub mod reaper;
pub mod runner;
pub mod scheduler;
